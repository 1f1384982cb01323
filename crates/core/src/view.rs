//! Plain-text and markdown tables of backlog items.

use crate::item::BacklogItem;
use crate::links::make_item_link;
use crate::status::BacklogItemStatus;
use crate::text_layout::{
    pad_int_left, pad_string_left, pad_string_right, text_width, title_first_letter,
};
use std::path::Path;

const USER_HEADER: &str = "User";
const TITLE_HEADER: &str = "Title";
const POINTS_HEADER: &str = "Points";
const ORDER_HEADER: &str = "   # |";
const ORDER_BORDER: &str = "------";

#[derive(Debug, Default, Clone, Copy)]
pub struct BacklogView;

impl BacklogView {
    /// Renders `items` as a fixed-width table, optionally preceded by `title` and a
    /// running order number column.
    ///
    /// ```text
    /// -----------------------
    ///  User | Title | Points
    /// -----------------------
    ///  bob  | Login |      3
    /// -----------------------
    /// ```
    ///
    /// With no items only the header rows are written, without a closing border.
    ///
    /// Blank points cells are padded to the column width like every other cell, where a
    /// plain empty cell would leave those rows shorter than the borders.
    pub fn write_ascii_table(
        &self,
        items: &[&BacklogItem],
        title: &str,
        with_order_number: bool,
    ) -> Vec<String> {
        let points: Vec<String> = items.iter().map(|item| points_text(item)).collect();
        let user_width = column_width(USER_HEADER, items.iter().map(|item| item.assigned()));
        let title_width = column_width(TITLE_HEADER, items.iter().map(|item| item.title()));
        let points_width = column_width(POINTS_HEADER, points.iter().map(String::as_str));

        let mut border = format!(
            "-{}---{}---{}-",
            "-".repeat(user_width),
            "-".repeat(title_width),
            "-".repeat(points_width)
        );
        let mut header = format!(
            " {} | {} | {} ",
            pad_string_right(USER_HEADER, user_width),
            pad_string_right(TITLE_HEADER, title_width),
            pad_string_right(POINTS_HEADER, points_width)
        );
        if with_order_number {
            border.insert_str(0, ORDER_BORDER);
            header.insert_str(0, ORDER_HEADER);
        }

        let mut lines = Vec::with_capacity(items.len() + 5);
        if !title.is_empty() {
            lines.push(title.to_string());
        }
        lines.push(border.clone());
        lines.push(header);
        lines.push(border.clone());

        for (index, (item, points)) in items.iter().zip(&points).enumerate() {
            let mut line = format!(
                " {} | {} | {} ",
                pad_string_right(item.assigned(), user_width),
                pad_string_right(item.title(), title_width),
                pad_string_left(points, points_width)
            );
            if with_order_number {
                let order = i64::try_from(index + 1).unwrap_or(i64::MAX);
                line.insert_str(0, &format!(" {} |", pad_int_left(order, 3)));
            }
            lines.push(line);
        }

        if !items.is_empty() {
            lines.push(border);
        }
        lines
    }

    /// Renders `items` as a markdown table whose titles link to the item files.
    pub fn write_markdown_table(&self, items: &[&BacklogItem], base_dir: &Path) -> Vec<String> {
        let mut lines = vec![
            format!(" {USER_HEADER} | {TITLE_HEADER} | {POINTS_HEADER} "),
            "---|---|:---:".to_string(),
        ];
        lines.extend(items.iter().map(|item| {
            format!(
                " {} | {} | {} ",
                item.assigned(),
                make_item_link(item, base_dir),
                item.estimate()
            )
        }));
        lines
    }
}

/// Title written above a status table, e.g. `Status: Flying`.
pub fn status_table_title(status: BacklogItemStatus) -> String {
    format!("Status: {}", title_first_letter(status.name()))
}

/// Points as a truncated integer; blank, zero and unparseable estimates render blank.
///
/// Only an estimate of exactly zero is blank: `0.5` truncates to `0` and is shown.
fn points_text(item: &BacklogItem) -> String {
    let points = item.estimate_points();
    if points == 0.0 {
        return String::new();
    }
    // Finite f64; `as` truncates toward zero and saturates out-of-range values.
    (points.trunc() as i64).to_string()
}

fn column_width<'a>(header: &str, values: impl Iterator<Item = &'a str>) -> usize {
    values.map(text_width).fold(text_width(header), usize::max)
}
