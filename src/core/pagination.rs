/// One page of an ordered listing.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub number: usize,
    pub per_page: usize,
    pub total_count: usize,
}

impl<T> Page<T> {
    /// Computes the total number of pages needed to display `total_count`
    /// items. An empty listing still has one (empty) page.
    pub fn num_pages(&self) -> usize {
        if self.total_count == 0 || self.per_page == 0 {
            1
        } else {
            self.total_count.div_ceil(self.per_page)
        }
    }

    pub fn has_previous(&self) -> bool {
        self.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.number < self.num_pages()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn map<U, F: FnMut(T) -> U>(self, f: F) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            number: self.number,
            per_page: self.per_page,
            total_count: self.total_count,
        }
    }
}

/// Slices `items` into the 1-based page `number`. Pages past the end come
/// back empty.
pub fn paginate<T>(items: Vec<T>, number: usize, per_page: usize) -> Page<T> {
    let number = number.max(1);
    let total_count = items.len();
    let start = (number - 1).saturating_mul(per_page);

    let items = items.into_iter().skip(start).take(per_page).collect();

    Page {
        items,
        number,
        per_page,
        total_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_pages_then_remainder() {
        let items: Vec<u32> = (0..13).collect();

        let first = paginate(items.clone(), 1, 10);
        assert_eq!(first.len(), 10);
        assert_eq!(first.items[0], 0);
        assert_eq!(first.num_pages(), 2);
        assert!(first.has_next());
        assert!(!first.has_previous());

        let second = paginate(items, 2, 10);
        assert_eq!(second.items, vec![10, 11, 12]);
        assert_eq!(second.total_count, 13);
        assert!(!second.has_next());
        assert!(second.has_previous());
    }

    #[test]
    fn out_of_range_page_is_empty() {
        let page = paginate(vec![1, 2, 3], 5, 10);
        assert!(page.is_empty());
        assert_eq!(page.number, 5);
        assert_eq!(page.total_count, 3);
        assert!(!page.has_next());
    }

    #[test]
    fn empty_listing_has_one_page() {
        let page = paginate(Vec::<u8>::new(), 1, 10);
        assert!(page.is_empty());
        assert_eq!(page.num_pages(), 1);
        assert!(!page.has_next());
        assert!(!page.has_previous());
    }

    #[test]
    fn page_zero_is_first_page() {
        let page = paginate(vec!['a', 'b'], 0, 1);
        assert_eq!(page.number, 1);
        assert_eq!(page.items, vec!['a']);
    }

    #[test]
    fn map_keeps_metadata() {
        let page = paginate(vec![1, 2, 3], 2, 2).map(|n| n * 10);
        assert_eq!(page.items, vec![30]);
        assert_eq!(page.number, 2);
        assert_eq!(page.total_count, 3);
    }
}
