//! Fixed-capacity sequence whose insertions report exhaustion instead of
//! silently truncating.

use std::ops::{Index, IndexMut};
use thiserror::Error;

/// Returned when an insertion would exceed the container's capacity.
/// Hands the rejected item back to the caller.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("bounded container is full (capacity {capacity})")]
pub struct CapacityError<T> {
    pub capacity: usize,
    pub item: T,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedVec<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> BoundedVec<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.items.len() >= self.capacity
    }

    pub fn try_push(&mut self, item: T) -> Result<(), CapacityError<T>> {
        self.try_insert(self.items.len(), item)
    }

    /// Inserts at `index`, shifting later elements back.
    ///
    /// Panics if `index > len`, like `Vec::insert`.
    pub fn try_insert(&mut self, index: usize, item: T) -> Result<(), CapacityError<T>> {
        if self.is_full() {
            return Err(CapacityError {
                capacity: self.capacity,
                item,
            });
        }
        self.items.insert(index, item);
        Ok(())
    }

    /// Inserts at the front and drops the last element, keeping the length
    /// constant. On an empty container this is a plain push.
    pub fn shift_in(&mut self, item: T) -> Option<T> {
        if self.capacity == 0 {
            return Some(item);
        }
        let dropped = self.items.pop();
        self.items.insert(0, item);
        dropped
    }

    pub fn pop(&mut self) -> Option<T> {
        self.items.pop()
    }

    /// Removes and returns the element at `index`, shifting later ones
    /// forward. Panics if `index >= len`, like `Vec::remove`.
    pub fn remove(&mut self, index: usize) -> T {
        self.items.remove(index)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn first(&self) -> Option<&T> {
        self.items.first()
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T: PartialEq> BoundedVec<T> {
    pub fn contains(&self, item: &T) -> bool {
        self.items.contains(item)
    }

    pub fn position(&self, item: &T) -> Option<usize> {
        self.items.iter().position(|candidate| candidate == item)
    }
}

impl<T> Index<usize> for BoundedVec<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<T> IndexMut<usize> for BoundedVec<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a BoundedVec<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_until_full() {
        let mut values = BoundedVec::new(2);
        assert!(values.try_push(1).is_ok());
        assert!(values.try_push(2).is_ok());
        assert!(values.is_full());

        let err = values.try_push(3).unwrap_err();
        assert_eq!(err.capacity, 2);
        assert_eq!(err.item, 3);
        assert_eq!(values.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_insert_at_front() {
        let mut values = BoundedVec::new(3);
        values.try_push(2).unwrap();
        values.try_insert(0, 1).unwrap();
        assert_eq!(values.as_slice(), &[1, 2]);
    }

    #[test]
    fn test_shift_in_keeps_length() {
        let mut values = BoundedVec::new(3);
        values.try_push(3).unwrap();
        values.try_push(2).unwrap();
        values.try_push(1).unwrap();

        let dropped = values.shift_in(4);
        assert_eq!(dropped, Some(1));
        assert_eq!(values.as_slice(), &[4, 3, 2]);
        assert_eq!(values.len(), 3);
    }

    #[test]
    fn test_shift_in_on_empty() {
        let mut values: BoundedVec<i32> = BoundedVec::new(1);
        assert_eq!(values.shift_in(7), None);
        assert_eq!(values.as_slice(), &[7]);
    }

    #[test]
    fn test_remove_then_reinsert() {
        let mut values = BoundedVec::new(3);
        values.try_push(1).unwrap();
        values.try_push(2).unwrap();
        values.try_push(3).unwrap();
        assert_eq!(values.remove(1), 2);
        values.try_insert(1, 9).unwrap();
        assert_eq!(values.as_slice(), &[1, 9, 3]);
    }

    #[test]
    fn test_zero_capacity_rejects_everything() {
        let mut values = BoundedVec::new(0);
        assert!(values.is_full());
        assert!(values.try_push("x").is_err());
        assert!(values.is_empty());
    }

    #[test]
    fn test_contains_and_position() {
        let mut values = BoundedVec::new(4);
        values.try_push('a').unwrap();
        values.try_push('b').unwrap();
        assert!(values.contains(&'b'));
        assert_eq!(values.position(&'b'), Some(1));
        assert_eq!(values.position(&'z'), None);
    }
}
