//! Output projector
//!
//! Reshapes a fully reduced output into what the caller asked for. The
//! reduce phase guarantees the merged records hold at least
//! `offset + limit` rows whenever that many exist, so slicing here yields
//! the exact requested window.

use serde_json::{Map, Value};

use crate::message::{ElementMapper, GatherSpec};
use crate::planner::{Element, RecordFormat};
use crate::reducer::{limit_cap, UNLIMITED};

use super::errors::{GatherError, GatherResult};

/// Projects one reduced output
pub fn project(spec: &GatherSpec, reduced: &Value) -> GatherResult<Value> {
    let Some(mappers) = &spec.elements else {
        return Ok(reduced.clone());
    };
    let mut elements = match reduced {
        Value::Object(elements) => elements.clone(),
        Value::Null => Map::new(),
        other => {
            return Err(GatherError::InvalidValue(format!(
                "'{}' must be an object of elements, got {}",
                spec.output, other
            )))
        }
    };

    // Step 1: Every mapper must name a known element
    for name in mappers.keys() {
        if Element::parse(name).is_none() {
            return Err(GatherError::UnknownElement(name.to_string()));
        }
    }

    // Step 2: Count targets that ignore the window
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for (name, mapper) in mappers.iter() {
        if let Some(target) = mapper.target.as_deref().filter(|_| mapper.before_window) {
            counts.push((name, count_target(&elements, target)?));
        }
    }

    // Step 3: Window and reshape records
    for (name, mapper) in mappers.iter().filter(|(_, m)| m.target.is_none()) {
        if let Some(value) = elements.get_mut(name) {
            let records = match value.take() {
                Value::Array(records) => records,
                Value::Null => Vec::new(),
                other => {
                    return Err(GatherError::InvalidValue(format!(
                        "'{}' must be a list of records, got {}",
                        name, other
                    )))
                }
            };
            *value = Value::Array(project_records(mapper, records)?);
        }
    }

    // Step 4: Count the remaining targets from the projected records
    for (name, mapper) in mappers.iter() {
        match &mapper.target {
            Some(target) if !mapper.before_window => {
                counts.push((name, count_target(&elements, target)?));
            }
            _ => {}
        }
    }
    for (name, size) in counts {
        elements.insert(name.to_string(), Value::from(size));
    }

    // Step 5: Drop hidden elements
    for (name, mapper) in mappers.iter() {
        if mapper.no_output {
            elements.remove(name);
        }
    }

    Ok(Value::Object(elements))
}

fn count_target(elements: &Map<String, Value>, target: &str) -> GatherResult<usize> {
    if Element::parse(target).is_none() {
        return Err(GatherError::InvalidSpec(format!(
            "count of unknown element '{}'",
            target
        )));
    }
    match elements.get(target) {
        Some(Value::Array(records)) => Ok(records.len()),
        None | Some(Value::Null) => Ok(0),
        Some(other) => Err(GatherError::InvalidValue(format!(
            "cannot count '{}': {}",
            target, other
        ))),
    }
}

/// Applies the window, then the record shape
pub fn project_records(mapper: &ElementMapper, records: Vec<Value>) -> GatherResult<Vec<Value>> {
    let offset = mapper.offset.unwrap_or(0);
    let limit = mapper.limit.unwrap_or(UNLIMITED);
    if offset < 0 || limit < UNLIMITED {
        return Err(GatherError::InvalidSpec(format!(
            "window offset={} limit={} is out of range",
            offset, limit
        )));
    }

    let skip = usize::try_from(offset).unwrap_or(usize::MAX);
    let window = records.into_iter().skip(skip);
    let windowed: Vec<Value> = match limit_cap(limit) {
        Some(cap) => window.take(cap).collect(),
        None => window.collect(),
    };

    let format = mapper.format.unwrap_or_default();
    let attributes = mapper.attributes.as_deref();
    Ok(windowed
        .into_iter()
        .map(|record| reshape(record, attributes, format))
        .collect())
}

/// Converts one record to the requested shape.
///
/// Tuples are matched to `attributes` by position. Without attributes a
/// tuple is returned whole.
pub fn reshape(record: Value, attributes: Option<&[String]>, format: RecordFormat) -> Value {
    let Some(attributes) = attributes else {
        return record;
    };
    match (record, format) {
        (Value::Array(mut values), RecordFormat::Simple) => {
            values.truncate(attributes.len());
            Value::Array(values)
        }
        (Value::Array(values), RecordFormat::Complex) => Value::Object(
            attributes
                .iter()
                .cloned()
                .zip(values)
                .collect::<Map<String, Value>>(),
        ),
        (Value::Object(fields), RecordFormat::Simple) => Value::Array(
            attributes
                .iter()
                .map(|name| fields.get(name).cloned().unwrap_or(Value::Null))
                .collect(),
        ),
        (Value::Object(mut fields), RecordFormat::Complex) => Value::Object(
            attributes
                .iter()
                .filter_map(|name| fields.remove(name).map(|value| (name.clone(), value)))
                .collect(),
        ),
        (other, _) => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::OrderedMap;
    use serde_json::json;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn spec(mappers: Vec<(&str, ElementMapper)>) -> GatherSpec {
        GatherSpec {
            output: "users".into(),
            elements: Some(mappers.into_iter().collect::<OrderedMap<_>>()),
        }
    }

    #[test]
    fn test_passthrough() {
        let value = json!(["shard1 timeout"]);
        assert_eq!(project(&GatherSpec::passthrough("errors"), &value).unwrap(), value);
    }

    #[test]
    fn test_window_and_complex_format() {
        let spec = spec(vec![(
            "records",
            ElementMapper::records(names(&["name", "age"]), RecordFormat::Complex, 1, 1),
        )]);
        let reduced = json!({"count": 9, "records": [["a", 30, 1], ["b", 20, 2], ["c", 10, 3]]});

        let projected = project(&spec, &reduced).unwrap();
        assert_eq!(
            projected,
            json!({"count": 9, "records": [{"name": "b", "age": 20}]})
        );
    }

    #[test]
    fn test_simple_format_truncates_sort_columns() {
        let spec = spec(vec![(
            "records",
            ElementMapper::records(names(&["name"]), RecordFormat::Simple, 0, UNLIMITED),
        )]);
        let projected = project(&spec, &json!({"records": [["a", 30], ["b", 20]]})).unwrap();
        assert_eq!(projected, json!({"records": [["a"], ["b"]]}));
    }

    #[test]
    fn test_count_recomputed_from_window() {
        let spec = spec(vec![
            ("count", ElementMapper::count_of("records")),
            (
                "records",
                ElementMapper::records(names(&["name"]), RecordFormat::Simple, 1, 2),
            ),
        ]);
        let reduced = json!({"records": [["a"], ["b"], ["c"], ["d"]]});
        let projected = project(&spec, &reduced).unwrap();
        assert_eq!(projected["count"], json!(2));
        assert_eq!(projected["records"], json!([["b"], ["c"]]));
    }

    #[test]
    fn test_group_count_ignores_window() {
        let spec = spec(vec![
            ("count", ElementMapper::count_all_of("records")),
            (
                "records",
                ElementMapper::records(names(&["_key"]), RecordFormat::Simple, 1, 1),
            ),
        ]);
        let reduced = json!({"records": [["jp"], ["us"], ["fr"]]});
        let projected = project(&spec, &reduced).unwrap();
        assert_eq!(projected, json!({"count": 3, "records": [["us"]]}));
    }

    #[test]
    fn test_hidden_records_still_counted() {
        let mut hidden = ElementMapper::records(names(&["_key"]), RecordFormat::Simple, 0, 3);
        hidden.no_output = true;
        let spec = spec(vec![
            ("count", ElementMapper::count_of("records")),
            ("records", hidden),
        ]);
        let projected = project(&spec, &json!({"records": [["jp"], ["us"]]})).unwrap();
        assert_eq!(projected, json!({"count": 2}));
    }

    #[test]
    fn test_unknown_element() {
        let spec = spec(vec![("startTime", ElementMapper::default())]);
        let err = project(&spec, &json!({})).unwrap_err();
        assert_eq!(err, GatherError::UnknownElement("startTime".into()));
    }

    #[test]
    fn test_invalid_values() {
        let spec = spec(vec![(
            "records",
            ElementMapper::records(Vec::new(), RecordFormat::Simple, 0, 1),
        )]);
        assert!(matches!(
            project(&spec, &json!({"records": 5})),
            Err(GatherError::InvalidValue(_))
        ));
        assert!(matches!(
            project(&spec, &json!(5)),
            Err(GatherError::InvalidValue(_))
        ));
    }

    #[test]
    fn test_reshape_complex_input() {
        let record = json!({"name": "a", "age": 3, "extra": true});
        let attributes = names(&["age", "name"]);
        assert_eq!(
            reshape(record.clone(), Some(attributes.as_slice()), RecordFormat::Simple),
            json!([3, "a"])
        );
        assert_eq!(
            reshape(record, Some(attributes.as_slice()), RecordFormat::Complex),
            json!({"age": 3, "name": "a"})
        );
    }
}
