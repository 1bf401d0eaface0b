use umya_spreadsheet::Worksheet;

use super::cells::{column_letter, parse_a1_range};

/// Pick the template row whose formatting new rows copy: the second data row
/// after the header, or the first when the sheet only has one.
pub fn template_row_for(header_rows: u32, max_date_row: u32) -> u32 {
    let second = header_rows + 2;
    if second <= max_date_row {
        second
    } else {
        header_rows + 1
    }
}

/// Insert `count` blank rows at `insert_at`, shifting the tail down, and make
/// each one visually identical to the template row: per-cell style (font,
/// border, fill, number format, protection, alignment), row height, and any
/// merged range confined to the template row, re-anchored.
pub fn synthesize_rows(ws: &mut Worksheet, insert_at: u32, count: u32, template_row: u32) {
    if count == 0 {
        return;
    }
    ws.insert_new_row(&insert_at, &count);

    // The insert shifts everything at or below insert_at, template included.
    let template = if template_row >= insert_at {
        template_row + count
    } else {
        template_row
    };

    let highest_column = ws.get_highest_column();
    let height = ws.get_row_dimension(&template).map(|r| *r.get_height());
    let merges = row_merges(ws, template);

    for offset in 0..count {
        let row = insert_at + offset;
        for column in 1..=highest_column {
            let style = ws
                .get_cell((column, template))
                .map(|cell| cell.get_style().clone())
                .unwrap_or_default();
            ws.get_cell_mut((column, row)).set_style(style);
        }
        if let Some(height) = height {
            ws.get_row_dimension_mut(&row).set_height(height);
        }
        for &(start_col, end_col) in &merges {
            ws.add_merge_cells(format!(
                "{}{}:{}{}",
                column_letter(start_col),
                row,
                column_letter(end_col),
                row
            ));
        }
    }
}

/// Merged ranges lying entirely within `row`, as (start_col, end_col) pairs.
fn row_merges(ws: &Worksheet, row: u32) -> Vec<(u32, u32)> {
    ws.get_merge_cells()
        .iter()
        .filter_map(|range| {
            let ((start_col, start_row), (end_col, end_row)) =
                parse_a1_range(&range.get_range())?;
            (start_row == row && end_row == row && end_col > start_col)
                .then_some((start_col, end_col))
        })
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;
    use umya_spreadsheet::Style;

    fn styled_sheet() -> umya_spreadsheet::Spreadsheet {
        let mut book = umya_spreadsheet::new_file();
        let ws = book.get_sheet_mut(&0).unwrap();
        ws.get_cell_mut("A1").set_value("Date");
        ws.get_cell_mut("B1").set_value("Result");
        for row in 2..=3 {
            ws.get_cell_mut((1, row)).set_value_number(45290 + row);
            let mut style = Style::default();
            style.get_number_format_mut().set_format_code("dd/mm/yyyy");
            style.get_font_mut().set_bold(true);
            ws.get_cell_mut((1, row)).set_style(style);
        }
        ws.get_row_dimension_mut(&3).set_height(21.5);
        ws.add_merge_cells("B3:C3");
        book
    }

    #[test]
    fn template_row_prefers_second_data_row() {
        assert_eq!(template_row_for(1, 10), 3);
        assert_eq!(template_row_for(1, 2), 2);
        assert_eq!(template_row_for(3, 20), 5);
    }

    #[test]
    fn new_rows_clone_template_formatting() {
        let mut book = styled_sheet();
        let ws = book.get_sheet_mut(&0).unwrap();
        synthesize_rows(ws, 4, 2, 3);

        let template_style = ws.get_cell((1, 3)).unwrap().get_style().clone();
        for row in 4..=5 {
            assert_eq!(ws.get_cell((1, row)).unwrap().get_style(), &template_style);
            assert_eq!(
                ws.get_row_dimension(&row).map(|r| *r.get_height()),
                Some(21.5)
            );
        }
        assert!(row_merges(ws, 4).contains(&(2, 3)));
        assert!(row_merges(ws, 5).contains(&(2, 3)));
    }

    #[test]
    fn insert_before_template_rebases_it() {
        let mut book = styled_sheet();
        let ws = book.get_sheet_mut(&0).unwrap();
        // Template row 3 moves to row 5 during the insert; its style must
        // still be the one copied.
        synthesize_rows(ws, 2, 2, 3);

        let template_style = ws.get_cell((1, 5)).unwrap().get_style().clone();
        assert_eq!(ws.get_cell((1, 2)).unwrap().get_style(), &template_style);
        assert_eq!(ws.get_cell((1, 3)).unwrap().get_style(), &template_style);
        // The template's own merge moved with it and was also replicated.
        assert!(row_merges(ws, 5).contains(&(2, 3)));
        assert!(row_merges(ws, 2).contains(&(2, 3)));
    }
}
