use crate::ir::{Attack, Edge, FlowConfig, Node, Solution, SolutionSummary};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

static TABLE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"Table\s+(\d+)").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Nodes,
    Edges,
    Attack,
    Solution,
}

impl fmt::Display for FileKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileKind::Nodes => "nodes",
            FileKind::Edges => "edges",
            FileKind::Attack => "attack",
            FileKind::Solution => "solution",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParseError {
    #[error("{file} file, line {line}: {message}")]
    Invalid {
        file: FileKind,
        line: usize,
        message: String,
    },
    #[error("{file} file has no header line")]
    Empty { file: FileKind },
}

/// Non-blank lines with their 1-based line numbers, split on tabs.
fn rows(input: &str) -> impl Iterator<Item = (usize, Vec<&str>)> {
    input
        .lines()
        .enumerate()
        .map(|(idx, line)| (idx + 1, line.trim_end_matches('\r')))
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_no, line)| (line_no, line.split('\t').map(str::trim).collect()))
}

struct Row<'a> {
    file: FileKind,
    line: usize,
    cells: Vec<&'a str>,
}

impl Row<'_> {
    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::Invalid {
            file: self.file,
            line: self.line,
            message: message.into(),
        }
    }

    fn required<T: FromStr>(&self, column: usize, name: &str) -> Result<T, ParseError> {
        let cell = self
            .cells
            .get(column)
            .ok_or_else(|| self.error(format!("missing column {name}")))?;
        cell.parse()
            .map_err(|_| self.error(format!("invalid {name} {cell:?}")))
    }

    fn coordinate(&self, column: usize, name: &str) -> Result<f64, ParseError> {
        let value: f64 = self.required(column, name)?;
        if !value.is_finite() {
            return Err(self.error(format!("non-finite {name} {value}")));
        }
        Ok(value)
    }

    /// Absent and empty cells are `None`.
    fn optional<T: FromStr>(&self, column: usize, name: &str) -> Result<Option<T>, ParseError> {
        match self.cells.get(column) {
            None => Ok(None),
            Some(cell) if cell.is_empty() => Ok(None),
            Some(_) => self.required(column, name).map(Some),
        }
    }

    fn attributes(&self, header: &[&str], from: usize) -> BTreeMap<String, String> {
        header
            .iter()
            .zip(&self.cells)
            .skip(from)
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }
}

/// Tab separated table with a header line; rows with fewer than two cells are
/// skipped.
fn table(input: &str, file: FileKind) -> Result<(Vec<&str>, Vec<Row<'_>>), ParseError> {
    let mut lines = input.lines();
    let header: Vec<&str> = lines
        .next()
        .map(|line| line.trim_end_matches('\r').split('\t').map(str::trim).collect())
        .ok_or(ParseError::Empty { file })?;
    let body = rows(input)
        .filter(|(line, _)| *line > 1)
        .filter(|(_, cells)| cells.len() > 1)
        .map(|(line, cells)| Row { file, line, cells })
        .collect();
    Ok((header, body))
}

/// Parses a nodes file: `ID, x, y, need, penalty, strength` followed by
/// free-form attribute columns named in the header.
pub fn parse_nodes(input: &str) -> Result<Vec<Node>, ParseError> {
    let (header, body) = table(input, FileKind::Nodes)?;
    body.iter()
        .map(|row| -> Result<Node, ParseError> {
            let mut node = Node::new(
                row.required(0, "ID")?,
                row.coordinate(1, "x")?,
                row.coordinate(2, "y")?,
                row.optional(3, "need")?.unwrap_or(0.0),
            );
            node.penalty = row.optional(4, "penalty")?;
            node.strength = row.optional(5, "strength")?;
            node.attributes = row.attributes(&header, 6);
            Ok(node)
        })
        .collect()
}

/// Parses an edges file: `start, stop, capacity, unitcost, strength`. Edge
/// ids are row indices.
pub fn parse_edges(input: &str) -> Result<Vec<Edge>, ParseError> {
    let (header, body) = table(input, FileKind::Edges)?;
    body.iter()
        .enumerate()
        .map(|(id, row)| -> Result<Edge, ParseError> {
            let mut edge = Edge::new(id, row.required(0, "start")?, row.required(1, "stop")?);
            edge.capacity = row.optional(2, "capacity")?;
            edge.unitcost = row.optional(3, "unitcost")?;
            edge.strength = row.optional(4, "strength")?;
            edge.attributes = row.attributes(&header, 5);
            Ok(edge)
        })
        .collect()
}

fn table_marker(cells: &[&str]) -> Option<u32> {
    let caps = TABLE_RE.captures(cells.first()?)?;
    caps[1].parse().ok()
}

/// Parses an attack file: node ids under `Table 1`, `start\tstop` edges under
/// `Table 2`.
pub fn parse_attack(input: &str) -> Result<Attack, ParseError> {
    let mut attack = Attack::default();
    let mut table = None;
    for (line, cells) in rows(input) {
        if let Some(marker) = table_marker(&cells) {
            table = Some(marker);
            continue;
        }
        let row = Row {
            file: FileKind::Attack,
            line,
            cells,
        };
        match table {
            Some(1) => attack.nodes.push(row.required(0, "node id")?),
            Some(2) => attack
                .edges
                .push((row.required(0, "start")?, row.required(1, "stop")?)),
            _ => return Err(row.error("row outside of a table")),
        }
    }
    Ok(attack)
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum SolutionSection {
    Summary,
    Flows { after: bool },
    Uncovered { after: bool },
    Closed,
}

/// Parses a solution file: summary under `Table 1`, flows and uncovered need
/// before the attack under `Table 2`, after it under `Table 3`.
pub fn parse_solution(input: &str) -> Result<Solution, ParseError> {
    let mut solution = Solution::default();
    let mut section = None;
    for (line, cells) in rows(input) {
        if let Some(marker) = table_marker(&cells) {
            section = match marker {
                1 => Some(SolutionSection::Summary),
                2 => Some(SolutionSection::Flows { after: false }),
                3 => Some(SolutionSection::Flows { after: true }),
                _ => Some(SolutionSection::Closed),
            };
            continue;
        }
        let row = Row {
            file: FileKind::Solution,
            line,
            cells,
        };
        match section {
            Some(SolutionSection::Summary) => {
                if solution.summary.is_none() {
                    solution.summary = parse_summary(row.cells[0]);
                }
            }
            Some(SolutionSection::Flows { after }) => {
                if row.cells[0].contains("covered") {
                    section = Some(if row.cells[0].contains("uncovered") {
                        SolutionSection::Uncovered { after }
                    } else {
                        SolutionSection::Closed
                    });
                    continue;
                }
                let key = (row.required(0, "start")?, row.required(1, "stop")?);
                let flow = row.required(2, "flow")?;
                flow_config(&mut solution, after).flows.insert(key, flow);
            }
            Some(SolutionSection::Uncovered { after }) => {
                let id = row.required(0, "node id")?;
                let value = (row.required(1, "uncovered need")?, row.required(2, "cost")?);
                flow_config(&mut solution, after).uncovered.insert(id, value);
            }
            Some(SolutionSection::Closed) => {}
            None => return Err(row.error("row outside of a table")),
        }
    }
    Ok(solution)
}

fn flow_config(solution: &mut Solution, after: bool) -> &mut FlowConfig {
    if after {
        &mut solution.after
    } else {
        &mut solution.before
    }
}

/// `Total cost of the attack: LOSS (= AFTER - BEFORE)` style line; numbers
/// are the whitespace tokens 5, 7 and 9.
fn parse_summary(line: &str) -> Option<SolutionSummary> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let number = |idx: usize| -> Option<f64> {
        tokens
            .get(idx)?
            .trim_matches(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-'))
            .parse()
            .ok()
    };
    Some(SolutionSummary {
        attack_loss: number(5)?,
        normal_costs: number(7)?,
        attack_costs: number(9)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nodes_with_attributes() {
        let input = "ID\tx\ty\tneed\tpenalty\tstrength\tname\n\
                     1\t0.5\t1.5\t-10\t0\t1\tplant\r\n\
                     \n\
                     2\t2\t3\t4\t20\t1\tcity\n";
        let nodes = parse_nodes(input).unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].id, 1);
        assert_eq!(nodes[0].coords, (0.5, 1.5));
        assert_eq!(nodes[0].need, -10.0);
        assert_eq!(nodes[1].penalty, Some(20.0));
        assert_eq!(nodes[1].attributes.get("name").map(String::as_str), Some("city"));
    }

    #[test]
    fn bad_number_reports_line() {
        let input = "ID\tx\ty\tneed\n1\t0\t0\t1\n2\tfoo\t0\t1\n";
        let err = parse_nodes(input).unwrap_err();
        assert_eq!(
            err,
            ParseError::Invalid {
                file: FileKind::Nodes,
                line: 3,
                message: "invalid x \"foo\"".to_string(),
            }
        );
        assert_eq!(err.to_string(), "nodes file, line 3: invalid x \"foo\"");
        assert_eq!(parse_nodes("").unwrap_err(), ParseError::Empty { file: FileKind::Nodes });
    }

    #[test]
    fn non_finite_coordinates_are_rejected() {
        let input = "ID\tx\ty\tneed\n1\t0\t0\t1\n2\tNaN\t0\t1\n";
        assert!(matches!(
            parse_nodes(input),
            Err(ParseError::Invalid { line: 3, ref message, .. }) if message == "non-finite x NaN"
        ));
        let input = "ID\tx\ty\tneed\n1\t0\tinf\t1\n";
        assert!(matches!(parse_nodes(input), Err(ParseError::Invalid { line: 2, .. })));
    }

    #[test]
    fn edges_are_numbered_by_row() {
        let input = "start\tstop\tcapacity\tunitcost\tstrength\n1\t2\t5\t1\t1\n2\t3\t7.5\t1\t1\n";
        let edges = parse_edges(input).unwrap();
        assert_eq!(edges.len(), 2);
        assert_eq!(edges[1].id, 1);
        assert_eq!((edges[1].start, edges[1].end), (2, 3));
        assert_eq!(edges[1].capacity, Some(7.5));
        assert_eq!(edges[0].flux, None);
    }

    #[test]
    fn attack_tables() {
        let input = "Table 1: nodes\r\n3\r\n \r\n4\r\nTable 2: edges\r\n1\t2\r\n";
        let attack = parse_attack(input).unwrap();
        assert_eq!(attack.nodes, vec![3, 4]);
        assert_eq!(attack.edges, vec![(1, 2)]);
    }

    #[test]
    fn solution_tables() {
        let input = "Table 1\n\
                     Total cost of the attack: 12.5 (= 40 - 27.5 )\n\
                     Table 2\n\
                     1\t2\t5\n\
                     2\t3\t4\n\
                     All needs covered\n\
                     Table 3\n\
                     1\t2\t3\n\
                     Some needs uncovered\n\
                     3\t1\t20\n";
        let solution = parse_solution(input).unwrap();
        assert_eq!(
            solution.summary,
            Some(SolutionSummary {
                attack_loss: 12.5,
                normal_costs: 40.0,
                attack_costs: 27.5,
            })
        );
        assert_eq!(solution.before.flows.len(), 2);
        assert!(solution.before.uncovered.is_empty());
        assert_eq!(solution.after.flows.get(&(1, 2)), Some(&3.0));
        assert_eq!(solution.after.uncovered.get(&3), Some(&(1.0, 20.0)));
    }

    #[test]
    fn rows_before_any_table_are_rejected() {
        assert!(matches!(
            parse_attack("3\n"),
            Err(ParseError::Invalid { line: 1, .. })
        ));
    }
}
