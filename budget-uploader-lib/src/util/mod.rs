use std::{collections::HashSet, hash::Hash};


/// Split items into the set of unique items and the set of items seen more than once
pub fn vec_to_hashsets<T, I>(items: I) -> (HashSet<T>, HashSet<T>)
where
    T: Eq + Hash + Clone,
    I: IntoIterator<Item = T>,
{
    let mut unique = HashSet::new();
    let mut duplicates = HashSet::new();
    for item in items {
        if !unique.insert(item.clone()) {
            duplicates.insert(item);
        }
    }
    (unique, duplicates)
}
