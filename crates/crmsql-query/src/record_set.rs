//! Result rows of a compiled query, split back into per-node records.

use crate::compiled::NodeOutput;
use crmsql_core::Row;

/// The columns of one tree node in one result row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRecord {
    pub info_area_id: String,
    /// `None` when an outer-joined node matched nothing.
    pub record_id: Option<String>,
    pub field_ids: Vec<i32>,
    pub values: Vec<Option<String>>,
    pub link_values: Vec<Option<String>>,
}

impl NodeRecord {
    pub fn field(&self, field_id: i32) -> Option<&str> {
        self.field_ids
            .iter()
            .position(|&id| id == field_id)
            .and_then(|pos| self.values.get(pos))
            .and_then(Option::as_deref)
    }

    pub fn is_empty(&self) -> bool {
        self.record_id.is_none()
    }
}

#[derive(Debug, Clone)]
pub struct RecordSet {
    rows: Vec<Row>,
    outputs: Vec<NodeOutput>,
}

impl RecordSet {
    pub fn new(rows: Vec<Row>, outputs: Vec<NodeOutput>) -> Self {
        Self { rows, outputs }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn outputs(&self) -> &[NodeOutput] {
        &self.outputs
    }

    /// Slice row `row` for the `node`-th contributing node (pre-order).
    pub fn node_record(&self, row: usize, node: usize) -> Option<NodeRecord> {
        let row = self.rows.get(row)?;
        let output = self.outputs.get(node)?;
        Some(slice(row, output))
    }

    /// Every contributing node of row `row`.
    pub fn records(&self, row: usize) -> Vec<NodeRecord> {
        self.rows
            .get(row)
            .map(|row| self.outputs.iter().map(|o| slice(row, o)).collect())
            .unwrap_or_default()
    }
}

fn slice(row: &Row, output: &NodeOutput) -> NodeRecord {
    let range = |first: usize, len: usize| -> Vec<Option<String>> {
        (first..first + len).map(|i| row.column(i)).collect()
    };
    NodeRecord {
        info_area_id: row
            .column(output.info_area_id_index)
            .unwrap_or_else(|| output.info_area_id.clone()),
        record_id: row.column(output.record_id_index),
        field_ids: output.field_ids.clone(),
        values: range(output.first_field_index, output.field_ids.len()),
        link_values: range(output.first_link_field_index, output.link_field_names.len()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmsql_core::Value;

    fn outputs() -> Vec<NodeOutput> {
        vec![
            NodeOutput {
                alias: "_FI".to_string(),
                info_area_id: "FI".to_string(),
                field_ids: vec![0],
                first_field_index: 0,
                link_field_names: vec![],
                first_link_field_index: 1,
                record_id_index: 1,
                info_area_id_index: 2,
            },
            NodeOutput {
                alias: "_FIKP0".to_string(),
                info_area_id: "KP".to_string(),
                field_ids: vec![2, 3],
                first_field_index: 3,
                link_field_names: vec![],
                first_link_field_index: 5,
                record_id_index: 5,
                info_area_id_index: 6,
            },
        ]
    }

    #[test]
    fn rows_split_into_node_records() {
        let names = ["F0", "recid", "title", "F2", "F3", "recid", "title"]
            .map(String::from)
            .to_vec();
        let rows = vec![
            Row::new(
                names.clone(),
                vec![
                    Value::from("ACME"),
                    Value::from("FI1"),
                    Value::from("FI"),
                    Value::from("Ann"),
                    Value::Null,
                    Value::from("KP1"),
                    Value::from("KP"),
                ],
            ),
            Row::new(
                names,
                vec![
                    Value::from("Globex"),
                    Value::from("FI2"),
                    Value::from("FI"),
                    Value::Null,
                    Value::Null,
                    Value::Null,
                    Value::Null,
                ],
            ),
        ];
        let set = RecordSet::new(rows, outputs());
        assert_eq!(set.row_count(), 2);

        let records = set.records(0);
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].record_id.as_deref(), Some("FI1"));
        assert_eq!(records[0].field(0), Some("ACME"));
        assert_eq!(records[1].field(2), Some("Ann"));
        assert_eq!(records[1].field(3), None);

        let missing = set.node_record(1, 1).unwrap();
        assert!(missing.is_empty());
        assert_eq!(missing.info_area_id, "KP");
        assert!(set.node_record(5, 0).is_none());
        assert!(set.records(5).is_empty());
    }
}
