use std::collections::btree_map;
use std::iter::FusedIterator;
use std::ops::Range;

use super::PagedArray;

/// Iterator over every index of a [`PagedArray`], created by
/// [`PagedArray::iter`].
///
/// The iterator borrows the array, so the array cannot be mutated while an
/// iteration is in progress.
#[derive(Debug, Clone)]
pub struct Iter<'a, T> {
    array: &'a PagedArray<T>,
    range: Range<usize>,
}

impl<'a, T> Iter<'a, T> {
    pub(super) fn new(array: &'a PagedArray<T>) -> Self {
        Self {
            array,
            range: 0..array.count(),
        }
    }

    fn at(&self, index: usize) -> &'a T {
        let page = index / self.array.objects_per_page;
        match self.array.pages.get(&page) {
            Some(objects) => &objects[index - page * self.array.objects_per_page],
            None => &self.array.placeholder,
        }
    }
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.range.next()?;
        Some(self.at(index))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.range.size_hint()
    }
}

impl<T> DoubleEndedIterator for Iter<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        let index = self.range.next_back()?;
        Some(self.at(index))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<T> FusedIterator for Iter<'_, T> {}

/// Iterator over the loaded pages of a [`PagedArray`], created by
/// [`PagedArray::loaded_pages`].
#[derive(Debug, Clone)]
pub struct LoadedPages<'a, T> {
    inner: btree_map::Iter<'a, usize, Vec<T>>,
}

impl<'a, T> LoadedPages<'a, T> {
    pub(super) fn new(inner: btree_map::Iter<'a, usize, Vec<T>>) -> Self {
        Self { inner }
    }
}

impl<'a, T> Iterator for LoadedPages<'a, T> {
    type Item = (usize, &'a [T]);

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|(page, objects)| (*page, objects.as_slice()))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<T> ExactSizeIterator for LoadedPages<'_, T> {}
