//! Serde encoding for [`PagedArray`].
//!
//! The encoded form carries the shape fields, the placeholder and the sparse
//! page map. Decoding rebuilds the array through the validating constructors,
//! so a decoded value always satisfies the page length invariants.

use std::collections::BTreeMap;

use serde::de::{self, Deserializer};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};

use super::PagedArray;

#[derive(Serialize)]
struct EncodedRef<'a, T> {
    total_count: usize,
    objects_per_page: usize,
    placeholder: &'a T,
    pages: &'a BTreeMap<usize, Vec<T>>,
}

#[derive(Deserialize)]
struct Encoded<T> {
    total_count: usize,
    objects_per_page: usize,
    placeholder: T,
    #[serde(default = "BTreeMap::new")]
    pages: BTreeMap<usize, Vec<T>>,
}

impl<T: Serialize> Serialize for PagedArray<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        EncodedRef {
            total_count: self.total_count,
            objects_per_page: self.objects_per_page,
            placeholder: &self.placeholder,
            pages: &self.pages,
        }
        .serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for PagedArray<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = Encoded::<T>::deserialize(deserializer)?;
        let mut array = PagedArray::with_placeholder(
            encoded.total_count,
            encoded.objects_per_page,
            encoded.placeholder,
        )
        .map_err(de::Error::custom)?;
        for (page, objects) in encoded.pages {
            array.set_objects(objects, page).map_err(de::Error::custom)?;
        }
        Ok(array)
    }
}
