//! The loaded values of one catalog, in code order and display order.

use crate::value::CatalogValue;
use crmsql_schema::Cached;
use std::cmp::Ordering;

/// Display order of a catalog, chosen by its kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CatalogSortOrder {
    /// Fixed catalogs, default: text, ordinal.
    FixedByText,
    /// Fixed catalogs when the database enables sort-info ordering.
    FixedBySortInfo,
    /// Variable and dependent catalogs.
    VariableBySortInfo,
}

impl CatalogSortOrder {
    pub fn compare(self, a: &CatalogValue, b: &CatalogValue) -> Ordering {
        match self {
            CatalogSortOrder::FixedByText => a.text.cmp(&b.text),
            CatalogSortOrder::FixedBySortInfo => {
                match (a.sort_info > 0, b.sort_info > 0) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (true, true) => a.sort_info.cmp(&b.sort_info).then(a.code.cmp(&b.code)),
                    (false, false) => a.code.cmp(&b.code),
                }
            }
            CatalogSortOrder::VariableBySortInfo => {
                match (a.sort_info > 0, b.sort_info > 0) {
                    (true, false) => Ordering::Less,
                    (false, true) => Ordering::Greater,
                    (true, true) => a.sort_info.cmp(&b.sort_info).then_with(|| a.text.cmp(&b.text)),
                    (false, false) => a.text.cmp(&b.text),
                }
            }
        }
    }
}

/// Values of one catalog.
///
/// [`values`](Self::values) is always ascending by code once sorted, so
/// positions line up with what [`update`](crate::CatalogInfo::update) writes.
/// The display order is computed lazily and dropped on every mutation.
#[derive(Debug, Clone)]
pub struct CatalogValueSet {
    values: Vec<CatalogValue>,
    sort_order: Option<CatalogSortOrder>,
    sorted: bool,
    display_order: Cached<Vec<usize>>,
}

impl CatalogValueSet {
    pub fn new(sort_order: Option<CatalogSortOrder>) -> Self {
        Self {
            values: Vec::new(),
            sort_order,
            sorted: true,
            display_order: Cached::Stale,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn sort_order(&self) -> Option<CatalogSortOrder> {
        self.sort_order
    }

    pub fn add(&mut self, value: CatalogValue) {
        self.values.push(value);
        self.sorted = false;
        self.display_order.invalidate();
    }

    /// Stable sort by code.
    pub fn sort(&mut self) {
        if !self.sorted {
            self.values.sort_by_key(|v| v.code);
            self.sorted = true;
            self.display_order.invalidate();
        }
    }

    /// Values in code order (insertion order until [`sort`](Self::sort)).
    pub fn values(&self) -> &[CatalogValue] {
        &self.values
    }

    /// First value carrying `code`.
    pub fn value_for_code(&self, code: i32) -> Option<&CatalogValue> {
        self.values.iter().find(|v| v.code == code)
    }

    pub fn text_for_code(&self, code: i32) -> Option<&str> {
        self.value_for_code(code).map(|v| v.text.as_str())
    }

    /// Values in display order. Without a sort order this is code order.
    pub fn sorted_values(&mut self) -> Vec<&CatalogValue> {
        self.sort();
        let values = &self.values;
        let order = self.sort_order;
        let indices = self.display_order.get_or_insert_with(|| {
            let mut indices: Vec<usize> = (0..values.len()).collect();
            if let Some(order) = order {
                indices.sort_by(|&a, &b| order.compare(&values[a], &values[b]));
            }
            indices
        });
        indices.iter().map(|&i| &values[i]).collect()
    }

    /// Codes in display order.
    pub fn sorted_codes(&mut self) -> Vec<i32> {
        self.sorted_values().into_iter().map(|v| v.code).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_b_a() -> Vec<CatalogValue> {
        vec![CatalogValue::fixed(1, "B", 0), CatalogValue::fixed(2, "A", 0)]
    }

    #[test]
    fn fixed_catalog_code_and_text_order() {
        let mut set = CatalogValueSet::new(Some(CatalogSortOrder::FixedByText));
        for v in fixed_b_a().into_iter().rev() {
            set.add(v);
        }
        set.sort();
        let codes: Vec<i32> = set.values().iter().map(|v| v.code).collect();
        assert_eq!(codes, vec![1, 2]);
        assert_eq!(set.sorted_codes(), vec![2, 1]);
    }

    #[test]
    fn add_invalidates_display_order() {
        let mut set = CatalogValueSet::new(Some(CatalogSortOrder::FixedByText));
        for v in fixed_b_a() {
            set.add(v);
        }
        assert_eq!(set.sorted_codes(), vec![2, 1]);
        set.add(CatalogValue::fixed(0, "0", 0));
        assert_eq!(set.sorted_codes(), vec![0, 2, 1]);
        assert_eq!(set.values()[0].code, 0);
    }

    #[test]
    fn fixed_sort_info_prefers_positive() {
        let mut set = CatalogValueSet::new(Some(CatalogSortOrder::FixedBySortInfo));
        set.add(CatalogValue::fixed(1, "x", 0));
        set.add(CatalogValue::fixed(2, "y", 5));
        set.add(CatalogValue::fixed(3, "z", 2));
        set.add(CatalogValue::fixed(4, "w", 2));
        set.add(CatalogValue::fixed(0, "v", 0));
        assert_eq!(set.sorted_codes(), vec![3, 4, 2, 0, 1]);
    }

    #[test]
    fn variable_sort_info_then_text() {
        let mut set = CatalogValueSet::new(Some(CatalogSortOrder::VariableBySortInfo));
        set.add(CatalogValue::variable(1, "b", 0, "", 0));
        set.add(CatalogValue::variable(2, "a", -1, "", 0));
        set.add(CatalogValue::variable(3, "z", 1, "", 0));
        set.add(CatalogValue::variable(4, "c", 1, "", 0));
        set.add(CatalogValue::variable(5, "y", 3, "", 0));
        assert_eq!(set.sorted_codes(), vec![4, 3, 5, 2, 1]);
    }

    #[test]
    fn ordinal_text_compare() {
        let mut set = CatalogValueSet::new(Some(CatalogSortOrder::FixedByText));
        set.add(CatalogValue::fixed(1, "b", 0));
        set.add(CatalogValue::fixed(2, "B", 0));
        set.add(CatalogValue::fixed(3, "a", 0));
        // uppercase sorts before lowercase
        assert_eq!(set.sorted_codes(), vec![2, 3, 1]);
    }

    #[test]
    fn duplicate_codes_return_first() {
        let mut set = CatalogValueSet::new(None);
        set.add(CatalogValue::fixed(7, "first", 0));
        set.add(CatalogValue::fixed(7, "second", 0));
        set.sort();
        assert_eq!(set.text_for_code(7), Some("first"));
        assert_eq!(set.text_for_code(8), None);
        assert_eq!(set.sorted_codes(), vec![7, 7]);
    }
}
