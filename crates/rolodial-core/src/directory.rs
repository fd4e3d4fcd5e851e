//! **Contact Directory** — fetch and parse the published-spreadsheet CSV.
//!
//! One HTTP GET, no retry. The body is a header row followed by data rows of
//! four columns: relation, contact person, subject, phone number. Fields may be
//! double-quoted; commas inside quotes are not separators. Rows missing a
//! person name or phone number are dropped at parse time.

use crate::error::{CallerError, CallerResult};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// One parsed contact row. Invariant: `person_name` and `phone_number` are
/// non-empty (rows failing this never leave the parser).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactRecord {
    pub relation: String,
    pub person_name: String,
    pub subject: String,
    pub phone_number: String,
}

/// Split one CSV line on commas outside double quotes. Doubled quotes inside a
/// quoted field decode to a literal quote. Fields come back trimmed.
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(field.trim().to_string());
                field.clear();
            }
            _ => field.push(c),
        }
    }
    fields.push(field.trim().to_string());
    fields
}

/// Parse CSV text into contacts. The first line is a header and is discarded.
/// Rows with an empty person name or phone number are dropped; zero surviving
/// rows is an error (the caller has nothing to read out).
pub fn parse_directory(text: &str) -> CallerResult<Vec<ContactRecord>> {
    let mut contacts = Vec::new();
    for line in text.lines().skip(1) {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line);
        let field = |i: usize| fields.get(i).cloned().unwrap_or_default();
        let record = ContactRecord {
            relation: field(0),
            person_name: field(1),
            subject: field(2),
            phone_number: field(3),
        };
        if record.person_name.is_empty() || record.phone_number.is_empty() {
            debug!("Directory: dropping incomplete row: {:?}", line);
            continue;
        }
        contacts.push(record);
    }
    if contacts.is_empty() {
        return Err(CallerError::EmptyDirectory);
    }
    Ok(contacts)
}

/// Fetches the directory CSV over HTTP.
#[derive(Debug, Clone, Default)]
pub struct DirectoryClient {
    client: reqwest::Client,
}

impl DirectoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// GET the CSV at `source_url` and parse it. A transport failure or a
    /// non-success status maps to [`CallerError::Network`].
    pub async fn load(&self, source_url: &str) -> CallerResult<Vec<ContactRecord>> {
        info!("Directory: fetching {}", source_url);
        let res = self.client.get(source_url).send().await?;
        if !res.status().is_success() {
            return Err(CallerError::Network(format!(
                "HTTP {} from {}",
                res.status(),
                source_url
            )));
        }
        let body = res.text().await?;
        let contacts = parse_directory(&body)?;
        info!("Directory: loaded {} contacts", contacts.len());
        Ok(contacts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "relation,person,subject,phone\n";

    #[test]
    fn parses_rows_in_order() {
        let csv = format!(
            "{}Family,Anna,Birthday,+31612345678\nWork,Ben,Invoice,0201234567\n",
            HEADER
        );
        let contacts = parse_directory(&csv).unwrap();
        assert_eq!(contacts.len(), 2);
        assert_eq!(contacts[0].person_name, "Anna");
        assert_eq!(contacts[0].relation, "Family");
        assert_eq!(contacts[1].person_name, "Ben");
        assert_eq!(contacts[1].phone_number, "0201234567");
    }

    #[test]
    fn drops_rows_missing_name_or_phone() {
        let csv = format!("{}A,,X,123\nA,B,X,\nA,B,X,123\n", HEADER);
        let contacts = parse_directory(&csv).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].person_name, "B");
    }

    #[test]
    fn quoted_commas_are_not_separators() {
        let csv = format!(
            "{}\"Doe, John\",Anna,\"Re: invoice, Q3\",\"+31 6 1234\"\n",
            HEADER
        );
        let contacts = parse_directory(&csv).unwrap();
        assert_eq!(contacts[0].relation, "Doe, John");
        assert_eq!(contacts[0].subject, "Re: invoice, Q3");
        assert_eq!(contacts[0].phone_number, "+31 6 1234");
    }

    #[test]
    fn doubled_quotes_decode_to_literal() {
        let csv = format!("{}\"The \"\"A\"\" team\",Anna,Hi,123\n", HEADER);
        let contacts = parse_directory(&csv).unwrap();
        assert_eq!(contacts[0].relation, "The \"A\" team");
    }

    #[test]
    fn blank_lines_are_skipped() {
        let csv = format!("{}\nFamily,Anna,Hi,123\n\n", HEADER);
        let contacts = parse_directory(&csv).unwrap();
        assert_eq!(contacts.len(), 1);
    }

    #[test]
    fn all_rows_invalid_is_empty_directory() {
        let csv = format!("{}A,,X,123\nA,B,X,\n", HEADER);
        assert!(matches!(
            parse_directory(&csv),
            Err(CallerError::EmptyDirectory)
        ));
    }

    #[test]
    fn header_only_is_empty_directory() {
        assert!(matches!(
            parse_directory(HEADER),
            Err(CallerError::EmptyDirectory)
        ));
    }

    #[test]
    fn missing_trailing_columns_become_empty() {
        // Short row: no phone column at all, so the row is dropped.
        let csv = format!("{}Family,Anna,Hi\n", HEADER);
        assert!(parse_directory(&csv).is_err());
    }
}
