// Primitives for reading CSV files.

use crate::election::*;

/// A row of an import file, with its position for error reporting.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ParsedRow {
    pub lineno: usize,
    pub first: String,
    pub second: String,
}

/// Reads a file of `id,name` rows.
///
/// Names may contain commas. A name can be quoted, otherwise the rest of the
/// line after the first comma is the name, as written.
pub fn read_candidates_csv(path: &str) -> ElectorResult<Vec<ParsedRow>> {
    read_pairs(path, true)
}

/// Reads a file of `voterId,candidateId` rows.
pub fn read_votes_csv(path: &str) -> ElectorResult<Vec<ParsedRow>> {
    read_pairs(path, false)
}

// Each line is parsed on its own, so that line numbers are the ones of the
// file, blank lines included.
fn read_pairs(path: &str, name_rest: bool) -> ElectorResult<Vec<ParsedRow>> {
    let contents = fs::read_to_string(path).context(CsvOpenSnafu { path })?;
    let mut res: Vec<ParsedRow> = Vec::new();
    for (idx, text) in contents.lines().enumerate() {
        let lineno = idx + 1;
        if text.trim().is_empty() {
            continue;
        }
        let record = match parse_line(text).context(CsvLineParseSnafu { path, lineno })? {
            Some(r) => r,
            None => continue,
        };
        debug!("read_pairs: {}:{} {:?}", path, lineno, record);
        let first = record
            .get(0)
            .context(CsvLineTooShortSnafu { path, lineno })?
            .to_string();
        let second = if name_rest {
            ensure!(record.len() >= 2, CsvLineTooShortSnafu { path, lineno });
            if record.len() == 2 {
                record[1].to_string()
            } else {
                let (_, rest) = text
                    .split_once(',')
                    .context(CsvLineTooShortSnafu { path, lineno })?;
                rest.trim().to_string()
            }
        } else {
            ensure!(record.len() == 2, CsvLineTooShortSnafu { path, lineno });
            record[1].to_string()
        };
        res.push(ParsedRow {
            lineno,
            first,
            second,
        });
    }
    info!("Read {} rows from {}", res.len(), path);
    Ok(res)
}

fn parse_line(text: &str) -> Result<Option<csv::StringRecord>, csv::Error> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let record = rdr.records().next().transpose();
    record
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_tmp(dir: &tempfile::TempDir, name: &str, contents: &str) -> String {
        let p = dir.path().join(name);
        fs::write(&p, contents).unwrap();
        p.display().to_string()
    }

    #[test]
    fn candidates_with_commas_in_names() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_tmp(&dir, "c.csv", "1,Alice\n2,Smith, Bob\n\n3,\"Doe, Jane\"\n");
        let rows = read_candidates_csv(&p).unwrap();
        let pairs: Vec<(usize, &str, &str)> = rows
            .iter()
            .map(|r| (r.lineno, r.first.as_str(), r.second.as_str()))
            .collect();
        assert_eq!(
            pairs,
            vec![(1, "1", "Alice"), (2, "2", "Smith, Bob"), (4, "3", "Doe, Jane")]
        );
    }

    #[test]
    fn votes() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_tmp(&dir, "v.csv", "100,1\n 101 , 2 \n");
        let rows = read_votes_csv(&p).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].first, "101");
        assert_eq!(rows[1].second, "2");
    }

    #[test]
    fn short_vote_row() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_tmp(&dir, "v.csv", "100,1\n101\n");
        let err = read_votes_csv(&p).unwrap_err();
        assert!(matches!(err, ElectorError::CsvLineTooShort { lineno: 2, .. }));
    }

    #[test]
    fn errors_point_at_the_line_in_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_tmp(&dir, "v.csv", "100,1\n\n  \n101,2\n102\n");
        let err = read_votes_csv(&p).unwrap_err();
        assert!(matches!(err, ElectorError::CsvLineTooShort { lineno: 5, .. }));

        let p = write_tmp(&dir, "c.csv", "\r\n1,Alice\r\n\r\n2\r\n");
        let err = read_candidates_csv(&p).unwrap_err();
        assert!(matches!(err, ElectorError::CsvLineTooShort { lineno: 4, .. }));
    }

    #[test]
    fn missing_file() {
        assert!(matches!(
            read_votes_csv("/does/not/exist.csv").unwrap_err(),
            ElectorError::CsvOpen { .. }
        ));
    }
}
