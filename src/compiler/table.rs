use super::Compiler;
use crate::error::CompileError;
use crate::markup::{leaf_text, tag_of, Element, Tag};
use serde_json::{Map, Value};
use sheaf_model::{Cell, Node, Phrase, Table};
use sheaf_style::{value_as_f32, Alignment, Font, StyleContext, VerticalAlignment};

const DEFAULT_CELL_PADDING: f32 = 2.0;

/// Upper bound for an explicit `num-cols`.
const MAX_COLUMNS: usize = 256;

/// Reads a list of numbers; `None` if any entry is not numeric.
fn number_list(value: &Value) -> Option<Vec<f32>> {
    match value {
        Value::Array(items) if !items.is_empty() => items.iter().map(value_as_f32).collect(),
        _ => None,
    }
}

fn border_enabled(context: &StyleContext) -> bool {
    !matches!(context.get("border"), Some(Value::Bool(false)))
}

/// Applies the cell attributes of `context` around compiled `content`.
fn styled_cell(content: Node, context: &StyleContext) -> Cell {
    Cell {
        content: Box::new(content),
        colspan: context.u32("colspan").unwrap_or(1).max(1) as usize,
        rowspan: context.u32("rowspan").unwrap_or(1).max(1) as usize,
        align: Alignment::parse_or(context.str("align"), Alignment::Left),
        valign: VerticalAlignment::parse_or(context.str("valign"), VerticalAlignment::Top),
        background: context
            .color("background-color")
            .or_else(|| context.color("background")),
        border: border_enabled(context),
        padding: context.f32("padding").unwrap_or(DEFAULT_CELL_PADDING),
    }
}

/// A header row as written in the `header` attribute.
struct HeaderSpec<'v> {
    style: Option<&'v Map<String, Value>>,
    entries: &'v [Value],
}

impl<'v> HeaderSpec<'v> {
    fn parse(value: Option<&'v Value>) -> Option<HeaderSpec<'v>> {
        let items = value?.as_array()?;
        let (style, entries) = match items.split_first() {
            Some((Value::Object(style), rest)) => (Some(style), rest),
            _ => (None, items.as_slice()),
        };
        Some(HeaderSpec { style, entries })
    }
}

impl Compiler<'_> {
    /// Content of a cell given its children.
    fn cell_content(&self, children: &[Value], context: &StyleContext, grid: bool) -> Result<Node, CompileError> {
        let inherited = context.inheritable();
        match children {
            [] => Ok(Node::Text(super::text::run(String::new(), &inherited))),
            [only] => match leaf_text(only) {
                Some(text) => {
                    let run = Node::Text(super::text::run(text, &inherited));
                    if grid {
                        Ok(Node::Phrase(Phrase {
                            children: vec![run],
                            font: Font::from_context(&inherited),
                            leading: None,
                        }))
                    } else {
                        Ok(run)
                    }
                }
                None => self.compile(only, &inherited),
            },
            many => Ok(Node::Phrase(Phrase {
                children: self.compile_children(many, context)?,
                font: Font::from_context(&inherited),
                leading: context.f32("leading"),
            })),
        }
    }

    pub(super) fn cell(&self, element: &Element<'_>, context: &StyleContext, grid: bool) -> Result<Cell, CompileError> {
        let content = self.cell_content(element.children, context, grid)?;
        Ok(styled_cell(content, context))
    }

    /// A row entry: explicit cells compile as such, anything else is promoted.
    fn row_cell(&self, item: &Value, context: &StyleContext, grid: bool) -> Result<Cell, CompileError> {
        match tag_of(item) {
            Some(Tag::Cell) | Some(Tag::GridCell) => match self.compile(item, context)? {
                Node::Cell(cell) | Node::GridCell(cell) => Ok(cell),
                other => Err(CompileError::invalid_node(
                    format!("cell compiled to {}", other.kind()),
                    item,
                )),
            },
            _ => {
                let content = self.cell_content(std::slice::from_ref(item), context, grid)?;
                Ok(styled_cell(content, &context.inheritable()))
            }
        }
    }

    fn header_cells(&self, spec: &HeaderSpec<'_>, context: &StyleContext, columns: usize, grid: bool) -> Result<Vec<Cell>, CompileError> {
        let mut header_context = context.inheritable();
        if let Some(style) = spec.style {
            header_context = header_context.merge(style);
        }
        let mut cells = spec
            .entries
            .iter()
            .map(|entry| match entry {
                Value::Array(parts) if tag_of(entry).is_none() => match parts.as_slice() {
                    [content, Value::Object(inline)] => {
                        let entry_context = header_context.merge(inline);
                        let content = self.cell_content(std::slice::from_ref(content), &entry_context, grid)?;
                        Ok(styled_cell(content, &entry_context))
                    }
                    _ => Err(CompileError::invalid_node(
                        "header entries are text, markup or [content, attributes]",
                        entry,
                    )),
                },
                _ => self.row_cell(entry, &header_context, grid),
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let [single] = cells.as_mut_slice() {
            single.colspan = columns;
        }
        Ok(cells)
    }

    fn build_table(
        &self,
        element: &Element<'_>,
        context: &StyleContext,
        rows: &[Value],
        widths: Option<Vec<f32>>,
        grid: bool,
    ) -> Result<Table, CompileError> {
        if rows.is_empty() {
            return Err(CompileError::EmptyTable);
        }
        let row_context = context.inheritable();
        let rows = rows
            .iter()
            .map(|row| match row {
                Value::Array(items) => items
                    .iter()
                    .map(|item| self.row_cell(item, &row_context, grid))
                    .collect::<Result<Vec<_>, _>>(),
                _ => Err(CompileError::invalid_node("table rows must be arrays", element.raw)),
            })
            .collect::<Result<Vec<_>, _>>()?;

        let header = HeaderSpec::parse(context.get("header"));
        let header_width = header.as_ref().map_or(0, |h| h.entries.len());
        let row_width = rows
            .iter()
            .map(|row| row.iter().map(|c| c.colspan).sum::<usize>())
            .max()
            .unwrap_or(0);
        let columns = match context.get("num-cols").and_then(Value::as_u64) {
            Some(n) if n > MAX_COLUMNS as u64 => {
                return Err(CompileError::InvalidAttribute {
                    tag: element.name.to_string(),
                    attribute: "num-cols".to_string(),
                    reason: format!("{} columns exceeds the limit of {}", n, MAX_COLUMNS),
                });
            }
            Some(n) if n > 0 => n as usize,
            _ => header_width.max(row_width),
        };
        let header = match header {
            Some(spec) => self.header_cells(&spec, context, columns, grid)?,
            None => Vec::new(),
        };

        let widths = match widths {
            Some(widths) if widths.len() != columns => {
                if grid {
                    return Err(CompileError::ColumnWidthMismatch {
                        expected: columns,
                        actual: widths.len(),
                    });
                }
                log::warn!(
                    "Ignoring {} column widths for a table with {} columns",
                    widths.len(),
                    columns
                );
                None
            }
            other => other,
        };
        if grid && widths.is_none() {
            return Err(CompileError::ColumnWidthMismatch {
                expected: columns,
                actual: 0,
            });
        }

        Ok(Table {
            columns,
            widths,
            header,
            rows,
            width_percent: context.f32("width").unwrap_or(100.0),
            align: Alignment::parse_or(context.str("align"), Alignment::Center),
            border: border_enabled(context),
            padding: context.f32("padding").unwrap_or(DEFAULT_CELL_PADDING),
            spacing: context.f32("spacing").unwrap_or(0.0),
        })
    }

    pub(super) fn table(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let widths = context.get("widths").and_then(number_list);
        self.build_table(element, context, element.children, widths, false)
            .map(Node::Table)
    }

    /// Like a table, but column widths are mandatory.
    pub(super) fn grid_table(&self, element: &Element<'_>, context: &StyleContext) -> Result<Node, CompileError> {
        let (leading_widths, rows) = match element.children.split_first() {
            Some((Value::Array(first), rest)) if !first.is_empty() && first.iter().all(Value::is_number) => {
                (number_list(&element.children[0]), rest)
            }
            Some(_) => (None, element.children),
            None => (None, element.children),
        };
        let widths = context.get("widths").and_then(number_list).or(leading_widths);
        self.build_table(element, context, rows, widths, true)
            .map(Node::GridTable)
    }
}
