// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use std::fmt;

use serde::de::{Deserialize, Deserializer, Error as _};
use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::report::{Error, ErrorKind, Report};

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    Number(Vec<f64>),
    Text(Vec<String>),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Number(v) => v.len(),
            Column::Text(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn cell(&self, row: usize) -> Value {
        match self {
            Column::Number(v) => Value::from(v[row]),
            Column::Text(v) => Value::from(v[row].as_str()),
        }
    }
}

impl From<Vec<f64>> for Column {
    fn from(v: Vec<f64>) -> Self {
        Column::Number(v)
    }
}

impl From<Vec<String>> for Column {
    fn from(v: Vec<String>) -> Self {
        Column::Text(v)
    }
}

impl From<Vec<&str>> for Column {
    fn from(v: Vec<&str>) -> Self {
        Column::Text(v.into_iter().map(str::to_owned).collect())
    }
}

/// Columnar table of equally long, named columns. Column order is insertion order.
///
/// Serializes as a list of row records:
///
/// ```
/// use explora::surprise::Frame;
///
/// let mut frame = Frame::new();
/// frame.insert("name", vec!["Ada", "Bex"]).unwrap();
/// frame.insert("rate", vec![0.5, 1.5]).unwrap();
///
/// assert_eq!(
///     serde_json::to_string(&frame).unwrap(),
///     r#"[{"name":"Ada","rate":0.5},{"name":"Bex","rate":1.5}]"#,
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    names: Vec<String>,
    columns: Vec<Column>,
}

impl Frame {
    pub fn new() -> Self {
        Frame::default()
    }

    /// Number of rows, zero for a frame without columns.
    pub fn rows(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Insert a column, replacing any column with the same name.
    pub fn insert<N, C>(&mut self, name: N, column: C) -> Report<()>
    where
        N: Into<String>,
        C: Into<Column>,
    {
        let name = name.into();
        let column = column.into();

        if !self.columns.is_empty() && column.len() != self.rows() {
            return Err(Error::new(
                ErrorKind::ColumnLength,
                format!(
                    "column `{name}` has {} rows, frame has {}",
                    column.len(),
                    self.rows()
                ),
            ));
        }

        match self.position(&name) {
            Some(idx) => self.columns[idx] = column,
            None => {
                self.names.push(name);
                self.columns.push(column);
            }
        }

        Ok(())
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.position(name).map(|idx| &self.columns[idx])
    }

    pub fn numbers(&self, name: &str) -> Report<&[f64]> {
        match self.column(name) {
            Some(Column::Number(v)) => Ok(v),
            Some(Column::Text(_)) => Err(Error::new(
                ErrorKind::ColumnType,
                format!("column `{name}` holds text, expected numbers"),
            )),
            None => Err(Error::missing_column(name)),
        }
    }

    pub fn text(&self, name: &str) -> Report<&[String]> {
        match self.column(name) {
            Some(Column::Text(v)) => Ok(v),
            Some(Column::Number(_)) => Err(Error::new(
                ErrorKind::ColumnType,
                format!("column `{name}` holds numbers, expected text"),
            )),
            None => Err(Error::missing_column(name)),
        }
    }

    /// Build a frame out of row records. The first record decides the columns and
    /// their types; `null` stands for a missing number.
    pub fn from_records(records: &[Map<String, Value>]) -> Report<Self> {
        let mut frame = Frame::new();

        let Some(first) = records.first() else {
            return Ok(frame);
        };

        for (name, sample) in first {
            let column = match sample {
                Value::String(_) => records
                    .iter()
                    .map(|record| match record.get(name) {
                        Some(Value::String(s)) => Ok(s.clone()),
                        other => Err(cell_error(name, "text", other)),
                    })
                    .collect::<Report<Vec<String>>>()
                    .map(Column::Text)?,
                _ => records
                    .iter()
                    .map(|record| match record.get(name) {
                        Some(Value::Number(n)) => Ok(n.as_f64().unwrap_or(f64::NAN)),
                        Some(Value::Null) => Ok(f64::NAN),
                        other => Err(cell_error(name, "a number", other)),
                    })
                    .collect::<Report<Vec<f64>>>()
                    .map(Column::Number)?,
            };

            frame.insert(name.as_str(), column)?;
        }

        Ok(frame)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }
}

fn cell_error(name: &str, expected: &str, found: Option<&Value>) -> Error {
    match found {
        None => Error::missing_column(name),
        Some(value) => Error::new(
            ErrorKind::ColumnType,
            format!("column `{name}` expected {expected}, found {value}"),
        ),
    }
}

struct Row<'a> {
    frame: &'a Frame,
    idx: usize,
}

impl Serialize for Row<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.frame.names.len()))?;

        for (name, column) in self.frame.names.iter().zip(&self.frame.columns) {
            map.serialize_entry(name, &column.cell(self.idx))?;
        }

        map.end()
    }
}

impl Serialize for Frame {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_seq((0..self.rows()).map(|idx| Row { frame: self, idx }))
    }
}

impl<'de> Deserialize<'de> for Frame {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let records = Vec::<Map<String, Value>>::deserialize(deserializer)?;

        Frame::from_records(&records).map_err(D::Error::custom)
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.names.join("\t"))?;

        for idx in 0..self.rows() {
            for (i, column) in self.columns.iter().enumerate() {
                if i > 0 {
                    f.write_str("\t")?;
                }
                match column {
                    Column::Number(v) => write!(f, "{}", v[idx])?,
                    Column::Text(v) => f.write_str(&v[idx])?,
                }
            }
            writeln!(f)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn length_mismatch() {
        let mut frame = Frame::new();
        frame.insert("a", vec![1.0, 2.0]).unwrap();

        let err = frame.insert("b", vec![1.0]).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::ColumnLength);
        assert_eq!(frame.names().collect::<Vec<_>>(), ["a"]);
    }

    #[test]
    fn replace_keeps_position() {
        let mut frame = Frame::new();
        frame.insert("a", vec![1.0]).unwrap();
        frame.insert("b", vec!["x"]).unwrap();
        frame.insert("a", vec![2.0]).unwrap();

        assert_eq!(frame.names().collect::<Vec<_>>(), ["a", "b"]);
        assert_eq!(frame.numbers("a").unwrap(), [2.0]);
    }

    #[test]
    fn typed_access() {
        let mut frame = Frame::new();
        frame.insert("name", vec!["x"]).unwrap();

        assert_eq!(frame.text("name").unwrap(), ["x"]);
        assert_eq!(frame.numbers("name").unwrap_err().kind(), ErrorKind::ColumnType);
        assert_eq!(frame.numbers("nope").unwrap_err().kind(), ErrorKind::MissingColumn);
    }

    #[test]
    fn from_json_records() {
        let frame: Frame = serde_json::from_value(json!([
            { "name": "A", "rate": 1, "population": 10.5 },
            { "name": "B", "rate": 2.5, "population": null },
        ]))
        .unwrap();

        assert_eq!(frame.rows(), 2);
        assert_eq!(frame.text("name").unwrap(), ["A", "B"]);
        assert_eq!(frame.numbers("rate").unwrap(), [1.0, 2.5]);
        assert!(frame.numbers("population").unwrap()[1].is_nan());
    }

    #[test]
    fn mixed_records_fail() {
        let res = serde_json::from_value::<Frame>(json!([
            { "name": "A" },
            { "name": 3 },
        ]));

        assert!(res.is_err());

        let records: Vec<Map<String, Value>> =
            serde_json::from_value(json!([{ "rate": 1 }, { "other": 2 }])).unwrap();
        let err = Frame::from_records(&records).unwrap_err();

        assert_eq!(err.kind(), ErrorKind::MissingColumn);
    }

    #[test]
    fn display_as_table() {
        let mut frame = Frame::new();
        frame.insert("name", vec!["A"]).unwrap();
        frame.insert("rate", vec![0.5]).unwrap();

        assert_eq!(frame.to_string(), "name\trate\nA\t0.5\n");
    }
}
