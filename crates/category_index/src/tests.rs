use super::*;

// -------------------- Lists --------------------

#[test]
fn empty_category_yields_nothing() {
    let idx = CategoryIndex::new();
    assert_eq!(idx.iter(0).count(), 0);
    assert_eq!(idx.count(255), 0);
    assert!(idx.is_empty());
}

#[test]
fn lists_keep_append_order() {
    let mut idx = CategoryIndex::new();
    idx.append(7, 1).unwrap();
    idx.append(7, 2).unwrap();
    idx.append(3, 3).unwrap();
    idx.append(7, 4).unwrap();

    assert_eq!(idx.iter(7).collect::<Vec<_>>(), vec![1, 2, 4]);
    assert_eq!(idx.iter(3).collect::<Vec<_>>(), vec![3]);
    assert_eq!(idx.count(7), 3);
    assert_eq!(idx.len(), 4);
}

#[test]
fn first_n_stops_early() {
    let mut idx = CategoryIndex::new();
    for id in 1..=10 {
        idx.append(1, id).unwrap();
    }
    assert_eq!(idx.first_n(1, 3).collect::<Vec<_>>(), vec![1, 2, 3]);
    assert_eq!(idx.first_n(1, 0).count(), 0);
    assert_eq!(idx.first_n(1, 100).count(), 10);
}

#[test]
fn extreme_category_values() {
    let mut idx = CategoryIndex::new();
    idx.append(0, 1).unwrap();
    idx.append(255, 2).unwrap();
    assert_eq!(idx.iter(0).collect::<Vec<_>>(), vec![1]);
    assert_eq!(idx.iter(255).collect::<Vec<_>>(), vec![2]);
}

#[test]
fn interleaved_lists_are_ascending_without_gaps_or_duplicates() {
    let mut idx = CategoryIndex::new();
    for id in 1..=1000u32 {
        idx.append((id * 31 % 17) as u8, id).unwrap();
    }

    let mut all = Vec::new();
    for c in 0..=255u8 {
        let ids: Vec<u32> = idx.iter(c).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(ids.len() as u32, idx.count(c));
        all.extend(ids);
    }
    all.sort_unstable();
    assert_eq!(all, (1..=1000).collect::<Vec<_>>());
}

#[test]
fn counts_cover_every_category() {
    let mut idx = CategoryIndex::new();
    idx.append(4, 1).unwrap();
    idx.append(4, 2).unwrap();
    let counts: Vec<_> = idx.counts().collect();
    assert_eq!(counts.len(), CATEGORIES);
    assert_eq!(counts[4], (4, 2));
    assert_eq!(counts.iter().map(|(_, n)| n).sum::<u32>(), 2);
}

#[test]
fn clear_resets_lists() {
    let mut idx = CategoryIndex::new();
    idx.append(9, 1).unwrap();
    idx.clear();
    assert!(idx.is_empty());
    assert_eq!(idx.iter(9).count(), 0);
    assert_eq!(idx, CategoryIndex::new());

    // Appending after a clear starts fresh lists
    idx.append(9, 5).unwrap();
    assert_eq!(idx.iter(9).collect::<Vec<_>>(), vec![5]);
}
