use serde_json::{Map, Number, Value};

/// Parser for the plain-text part of a ScanImage header, where every setting is
/// written as `SI.some.key = <matlab literal>` on its own line.
pub struct ScanImageHeader;

impl ScanImageHeader {

    /// Builds the flat key -> value mapping. Lines without an "=" are skipped.
    pub fn parse(header_str:&str) -> Map<String,Value> {
        let mut h = Map::new();
        header_str.lines().for_each(|line|{
            // split on the first = we find
            match line.find('=') {
                Some(index) => {
                    let (key,val) = line.split_at(index);
                    let key = key.trim();
                    if key.is_empty() {
                        return;
                    }
                    h.insert(key.to_string(),parse_literal(&val[1..]));
                },
                None => () // not a setting
            }
        });
        h
    }
}

/// Converts one matlab literal into json. Anything we don't understand is kept as a string.
pub fn parse_literal(raw:&str) -> Value {
    let s = raw.trim();
    match s {
        "true" => return Value::Bool(true),
        "false" => return Value::Bool(false),
        _ => ()
    }
    if s.len() >= 2 && s.starts_with('\'') && s.ends_with('\'') {
        return Value::String(s[1..s.len()-1].replace("''","'"));
    }
    if s.starts_with('[') && s.ends_with(']') {
        if let Some(matrix) = parse_matrix(&s[1..s.len()-1]) {
            return matrix;
        }
        return Value::String(s.to_string());
    }
    literal_number(s).unwrap_or_else(|| Value::String(s.to_string()))
}

fn literal_number(token:&str) -> Option<Value> {
    if let Ok(i) = token.parse::<i64>() {
        return Some(Value::from(i));
    }
    let f = token.parse::<f64>().ok()?;
    Number::from_f64(f).map(Value::Number)
}

/// "1 2;3 4" -> [[1,2],[3,4]], a single row stays flat
fn parse_matrix(inner:&str) -> Option<Value> {
    let inner = inner.trim();
    if inner.is_empty() {
        return Some(Value::Array(vec![]));
    }
    let mut rows = Vec::<Value>::new();
    for row in inner.split(';') {
        let row:Vec<Value> = row.split(|c:char| c.is_whitespace() || c == ',')
            .filter(|t| !t.is_empty())
            .map(literal_number)
            .collect::<Option<Vec<Value>>>()?;
        rows.push(Value::Array(row));
    }
    match rows.len() {
        1 => rows.pop(),
        _ => Some(Value::Array(rows))
    }
}
