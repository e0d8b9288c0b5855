//! Table → block-container layout conversion
//!
//! Rewrites every `<table>` into a container `<div>` holding one child per
//! row, each holding one child per cell. Tables are discovered
//! outermost-first but converted innermost-first: each table is marked
//! processed before recursing into it, so nested tables become nested
//! containers and the walk terminates. Must run before unwanted-tag pruning,
//! which would otherwise delete the orphaned `<tr>`/`<td>` originals.

use crate::dom::{Document, NodeId};
use std::collections::HashSet;

/// Convert all tables in the document.
pub fn convert_tables(doc: &mut Document) {
  let mut processed = HashSet::new();
  convert_in_scope(doc, doc.root(), &mut processed);
}

fn convert_in_scope(doc: &mut Document, scope: NodeId, processed: &mut HashSet<NodeId>) {
  for table in doc.elements_by_tag(scope, "table") {
    if !processed.insert(table) {
      continue;
    }
    convert_in_scope(doc, table, processed);
    convert_table(doc, table);
  }
}

fn copy_attrs(doc: &mut Document, source: NodeId, target: NodeId, names: &[&str]) {
  for name in names {
    if let Some(value) = doc.attr(source, name).map(str::to_string) {
      doc.set_attr(target, name, &value);
    }
  }
}

fn convert_table(doc: &mut Document, table: NodeId) {
  let container = doc.create_element("div");
  copy_attrs(doc, table, container, &["id", "class", "align", "bgcolor"]);
  if !doc.has_attr(container, "align") {
    doc.set_attr(container, "align", "center");
  }
  let width = doc
    .attr(table, "width")
    .map(str::to_string)
    .unwrap_or_else(|| "100%".to_string());
  doc.set_attr(container, "width", &width);

  let cellspacing: u32 = doc
    .attr(table, "cellspacing")
    .and_then(|v| v.trim().parse().ok())
    .unwrap_or(0);
  let has_border = doc
    .attr(table, "border")
    .is_some_and(|border| border != "0");
  let container_align = doc
    .attr(container, "align")
    .unwrap_or("center")
    .to_string();

  let rows = doc.elements_by_tag(table, "tr");
  let row_count = rows.len();

  for (row_index, row) in rows.iter().copied().enumerate() {
    let cells: Vec<NodeId> = doc
      .descendants(row)
      .into_iter()
      .filter(|&id| doc.is_tag(id, "td") || doc.is_tag(id, "th"))
      .collect();

    let row_div = doc.create_element("div");
    copy_attrs(doc, row, row_div, &["id", "class", "align", "valign", "bgcolor"]);
    if !doc.has_attr(row_div, "align") {
      doc.set_attr(row_div, "align", &container_align);
    }

    let is_header_row = cells.iter().any(|&cell| doc.is_tag(cell, "th"));

    for cell in cells.iter().copied() {
      let cell_div = doc.create_element("div");
      copy_attrs(
        doc,
        cell,
        cell_div,
        &["id", "class", "align", "valign", "width", "height", "bgcolor"],
      );

      if cells.len() == 1 {
        doc.set_attr(cell_div, "width", "100%");
      } else if !doc.has_attr(cell_div, "width") {
        let approx = 100 / cells.len() as u32;
        doc.set_attr(cell_div, "width", &format!("{approx}%"));
      }

      // colspan widens the cell's share, not the structure.
      let colspan: u32 = doc
        .attr(cell, "colspan")
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(1);
      if colspan > 1 && cells.len() > 1 {
        let current: u32 = doc
          .attr(cell_div, "width")
          .map(|w| w.trim_end_matches('%'))
          .and_then(|w| w.trim().parse().ok())
          .unwrap_or(0);
        doc.set_attr(cell_div, "width", &format!("{}%", current * colspan));
      }

      if is_header_row || doc.is_tag(cell, "th") {
        let inner = doc.create_element("div");
        let bold = doc.create_element("b");
        doc.reparent_children(cell, bold);
        doc.append_child(inner, bold);
        doc.append_child(cell_div, inner);
      } else {
        doc.reparent_children(cell, cell_div);
      }

      doc.append_child(row_div, cell_div);
    }

    doc.append_child(container, row_div);

    if row_index + 1 < row_count {
      if has_border {
        append_rule(doc, container);
      } else if cellspacing > 0 {
        let spacer = doc.create_element("div");
        doc.set_attr(spacer, "height", &cellspacing.to_string());
        doc.append_child(container, spacer);
      }
    }
  }

  if has_border {
    append_rule(doc, container);
  }

  doc.replace_with(table, container);
}

fn append_rule(doc: &mut Document, container: NodeId) {
  let hr = doc.create_element("hr");
  doc.set_attr(hr, "width", "100%");
  doc.set_attr(hr, "size", "1");
  doc.append_child(container, hr);
}
