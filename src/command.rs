//! Line-oriented command language driving a single tree, as used by the
//! interactive shell.

use std::fmt::Write as _;

use crate::error::CommandError;
use crate::geometry::{Point, Rectangle};
use crate::quadtree::Quadtree;
use crate::records;

/// Range results beyond this many are summarized instead of listed.
const MAX_LISTED: usize = 10;

pub const HELP: &str = "\
commands:
  insert <x> <y> [name...]   insert a point
  range <cx> <cy> <w> <h>    points inside a rectangle
  nearest <x> <y>            closest point
  count                      number of points
  filter <attr> <value>      points with attr == value
  stats                      tree shape
  clear                      remove every point
  help                       this text
  exit                       leave";

#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    Insert { x: f64, y: f64, name: Option<String> },
    Range(Rectangle),
    Nearest { x: f64, y: f64 },
    Count,
    /// `value` is kept as typed; see [`AttrValue::matches_text`](crate::AttrValue::matches_text).
    Filter { attribute: String, value: String },
    Stats,
    Clear,
    Help,
    Exit,
}

impl Command {
    /// Parses one input line. Blank lines yield `Ok(None)`.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let args: Vec<&str> = line.split_whitespace().collect();
        let Some((&name, rest)) = args.split_first() else {
            return Ok(None);
        };

        let command = match name {
            "insert" => match rest {
                [x, y, name @ ..] => Command::Insert {
                    x: number(x)?,
                    y: number(y)?,
                    name: (!name.is_empty()).then(|| name.join(" ")),
                },
                _ => return Err(CommandError::Usage("insert <x> <y> [name...]")),
            },
            "range" => match rest {
                [cx, cy, w, h, ..] => {
                    Command::Range(Rectangle::new(number(cx)?, number(cy)?, number(w)?, number(h)?))
                }
                _ => return Err(CommandError::Usage("range <cx> <cy> <w> <h>")),
            },
            "nearest" => match rest {
                [x, y, ..] => Command::Nearest {
                    x: number(x)?,
                    y: number(y)?,
                },
                _ => return Err(CommandError::Usage("nearest <x> <y>")),
            },
            "filter" => match rest {
                [attribute, value @ ..] if !value.is_empty() => Command::Filter {
                    attribute: attribute.to_string(),
                    value: value.join(" "),
                },
                _ => return Err(CommandError::Usage("filter <attr> <value>")),
            },
            "count" => Command::Count,
            "stats" => Command::Stats,
            "clear" => Command::Clear,
            "help" => Command::Help,
            "exit" | "quit" => Command::Exit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };
        Ok(Some(command))
    }
}

fn number(text: &str) -> Result<f64, CommandError> {
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(CommandError::InvalidNumber(text.to_string())),
    }
}

/// One shell session owning one tree.
#[derive(Debug)]
pub struct Session {
    tree: Quadtree,
}

impl Session {
    pub fn new(tree: Quadtree) -> Self {
        Self { tree }
    }

    pub fn tree(&self) -> &Quadtree {
        &self.tree
    }

    /// Runs `command` and renders its result as text.
    pub fn execute(&mut self, command: &Command) -> String {
        let mut out = String::new();
        match command {
            Command::Insert { x, y, name } => {
                let mut point = Point::new(*x, *y);
                if let Some(name) = name {
                    point = point.with_attribute("name", name.as_str());
                }
                match self.tree.try_insert(point) {
                    Ok(_) => {
                        let _ = write!(out, "inserted point at ({x}, {y})");
                    }
                    Err(e) => {
                        let _ = write!(out, "error: {e}");
                    }
                }
            }
            Command::Range(rect) => {
                let found = self.tree.query_range(rect);
                let _ = write!(out, "found {} points", found.len());
                for p in found.iter().take(MAX_LISTED) {
                    let _ = write!(out, "\n  ({:.2}, {:.2})", p.x, p.y);
                }
                if found.len() > MAX_LISTED {
                    let _ = write!(out, "\n  ... and {} more", found.len() - MAX_LISTED);
                }
            }
            Command::Nearest { x, y } => {
                let query = Point::new(*x, *y);
                match self.tree.nearest_neighbor_with_distance(&query) {
                    Some((p, distance)) => {
                        let _ = write!(out, "nearest: ({:.2}, {:.2})", p.x, p.y);
                        if let Some(name) = p.attribute("name") {
                            let _ = write!(out, " {name}");
                        }
                        let _ = write!(out, "\ndistance: {distance:.2}");
                    }
                    None => out.push_str("tree is empty"),
                }
            }
            Command::Count => {
                let _ = write!(out, "total points: {}", self.tree.count_points());
            }
            Command::Filter { attribute, value } => {
                let found = records::filter_by_text(&self.tree, attribute, value).len();
                let _ = write!(out, "found {found} points with {attribute}={value}");
            }
            Command::Stats => {
                let stats = self.tree.stats();
                let _ = write!(
                    out,
                    "points: {}\nnodes: {}\nleaves: {}\ndepth: {}\noverflowing leaves: {}",
                    stats.points, stats.nodes, stats.leaves, stats.depth, stats.overflowing_leaves
                );
            }
            Command::Clear => {
                self.tree.clear();
                out.push_str("cleared");
            }
            Command::Help => out.push_str(HELP),
            Command::Exit => {}
        }
        out
    }
}
