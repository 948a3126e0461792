//! Fixed-shape, sparsely populated paged array.
//!
//! A [`PagedArray`] has a total count and a page size that never change after
//! construction. Content is attached one page at a time; any index whose page
//! has no content reads as the placeholder.

mod codec;
mod iter;

use std::collections::BTreeMap;
use std::ops::{Index, Range};

use crate::error::{PagedArrayError, Result};

pub use iter::{Iter, LoadedPages};

/// Fixed-length sequence partitioned into equal-size pages whose content is
/// loaded independently.
///
/// Every page except possibly the last holds exactly
/// [`objects_per_page`](Self::objects_per_page) objects; the last page holds
/// the remainder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PagedArray<T> {
    total_count: usize,
    objects_per_page: usize,
    placeholder: T,
    pages: BTreeMap<usize, Vec<T>>,
}

impl<T: Default> PagedArray<T> {
    /// Creates an empty array using `T::default()` as the placeholder.
    ///
    /// With `T = Option<U>` the placeholder is `None`.
    pub fn new(total_count: usize, objects_per_page: usize) -> Result<Self> {
        Self::with_placeholder(total_count, objects_per_page, T::default())
    }
}

impl<T> PagedArray<T> {
    /// Creates an empty array that reads as `placeholder` until pages are set.
    pub fn with_placeholder(
        total_count: usize,
        objects_per_page: usize,
        placeholder: T,
    ) -> Result<Self> {
        if objects_per_page == 0 {
            return Err(PagedArrayError::ZeroPageSize);
        }
        Ok(Self {
            total_count,
            objects_per_page,
            placeholder,
            pages: BTreeMap::new(),
        })
    }

    /// Total number of objects, loaded or not.
    pub fn count(&self) -> usize {
        self.total_count
    }

    /// Returns `true` when the array has no indexes at all.
    pub fn is_empty(&self) -> bool {
        self.total_count == 0
    }

    /// Maximum number of objects per page.
    pub fn objects_per_page(&self) -> usize {
        self.objects_per_page
    }

    /// Number of pages, counting a trailing partial page.
    pub fn page_count(&self) -> usize {
        self.total_count.div_ceil(self.objects_per_page)
    }

    /// Value returned for indexes whose page has no content.
    pub fn placeholder(&self) -> &T {
        &self.placeholder
    }

    /// Number of pages that currently hold content.
    pub fn loaded_page_count(&self) -> usize {
        self.pages.len()
    }

    /// Returns the object at `index`, or the placeholder if its page is unset.
    pub fn object_at(&self, index: usize) -> Result<&T> {
        self.get(index).ok_or(PagedArrayError::IndexOutOfRange {
            index,
            count: self.total_count,
        })
    }

    /// Like [`object_at`](Self::object_at) but returns `None` when out of
    /// range.
    pub fn get(&self, index: usize) -> Option<&T> {
        let page = self.page_for(index)?;
        let value = match self.pages.get(&page) {
            Some(objects) => &objects[index - page * self.objects_per_page],
            None => &self.placeholder,
        };
        Some(value)
    }

    /// Replaces the content of `page`.
    ///
    /// `objects` must hold exactly [`page_len`](Self::page_len) values. On
    /// error the previous content of the page is left untouched.
    pub fn set_objects(&mut self, objects: Vec<T>, page: usize) -> Result<()> {
        let expected = self.page_len(page)?;
        if objects.len() != expected {
            return Err(PagedArrayError::SizeMismatch {
                page,
                expected,
                actual: objects.len(),
            });
        }
        self.pages.insert(page, objects);
        Ok(())
    }

    /// Unsets the content of `page`. Removing an unset page is a no-op.
    pub fn remove_objects(&mut self, page: usize) -> Result<()> {
        self.check_page(page)?;
        self.pages.remove(&page);
        Ok(())
    }

    /// Whether `page` currently holds content.
    pub fn is_content_set(&self, page: usize) -> Result<bool> {
        self.check_page(page)?;
        Ok(self.pages.contains_key(&page))
    }

    /// Page owning `index`, or `None` if `index` is out of range.
    pub fn page_for(&self, index: usize) -> Option<usize> {
        (index < self.total_count).then(|| index / self.objects_per_page)
    }

    /// Global indexes covered by `page`.
    pub fn indexes_for(&self, page: usize) -> Result<Range<usize>> {
        let len = self.page_len(page)?;
        let start = page * self.objects_per_page;
        Ok(start..start + len)
    }

    /// Number of objects `page` holds when loaded.
    pub fn page_len(&self, page: usize) -> Result<usize> {
        self.check_page(page)?;
        Ok(self.expected_len(page))
    }

    /// Iterates every index in order, yielding placeholders for unset pages.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter::new(self)
    }

    /// Iterates `(page, content)` for loaded pages in ascending page order.
    pub fn loaded_pages(&self) -> LoadedPages<'_, T> {
        LoadedPages::new(self.pages.iter())
    }

    fn expected_len(&self, page: usize) -> usize {
        if page + 1 == self.page_count() {
            self.total_count - page * self.objects_per_page
        } else {
            self.objects_per_page
        }
    }

    fn check_page(&self, page: usize) -> Result<()> {
        let page_count = self.page_count();
        if page >= page_count {
            return Err(PagedArrayError::InvalidPage { page, page_count });
        }
        Ok(())
    }
}

impl<T> Index<usize> for PagedArray<T> {
    type Output = T;

    /// Panics if `index` is out of range.
    fn index(&self, index: usize) -> &T {
        match self.object_at(index) {
            Ok(value) => value,
            Err(err) => panic!("{err}"),
        }
    }
}

impl<'a, T> IntoIterator for &'a PagedArray<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
