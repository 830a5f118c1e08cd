//! Default chart derivation for an uploaded workbook.
//!
//! The x axis is the first column whose value in the first data row is
//! numeric (default 0); the y axis is the next numeric column after it
//! (default 1). The result is always a single-series bar chart.

use sheetchart_core::constants::{
    CHART_BACKGROUND_COLOR, CHART_BORDER_COLOR, CHART_BORDER_WIDTH, DEFAULT_CHART_LIMIT,
};
use sheetchart_core::models::{
    Aggregation, AxisConfig, AxisKind, ChartConfig, ChartData, ChartType, Dataset, File, NewChart,
    SeriesConfig,
};

use crate::worksheet::{CellValue, Worksheet};

/// Column indices chosen for the x and y axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisSelection {
    pub x: usize,
    pub y: usize,
}

/// Pick axis columns from the first data row. `None` when the sheet has no data row.
pub fn select_axes(sheet: &Worksheet) -> Option<AxisSelection> {
    if sheet.rows.len() < 2 {
        return None;
    }
    let width = sheet.header().len();
    let is_numeric = |column: usize| sheet.cell(1, column).is_numeric();

    let x = (0..width).find(|&c| is_numeric(c)).unwrap_or(0);
    let y = (x + 1..width).find(|&c| is_numeric(c)).unwrap_or(1);

    Some(AxisSelection { x, y })
}

/// Build the auto-generated chart for `file` from its first worksheet.
pub fn infer_chart(sheet: &Worksheet, file: &File) -> Option<NewChart> {
    let AxisSelection { x, y } = select_axes(sheet)?;

    let header_text = |column: usize| {
        sheet
            .header()
            .get(column)
            .map(CellValue::display_text)
            .unwrap_or_default()
    };
    let x_header = header_text(x);
    let y_header = header_text(y);

    let rows = sheet.data_rows();
    let labels = (1..=rows.len()).map(|r| sheet.cell(r, x).to_json()).collect();
    let values = (1..=rows.len()).map(|r| sheet.cell(r, y).to_json()).collect();

    let config = ChartConfig {
        x_axis: AxisConfig {
            field: x_header.clone(),
            label: x_header.clone(),
            kind: AxisKind::Category,
        },
        y_axis: AxisConfig {
            field: y_header.clone(),
            label: y_header.clone(),
            kind: AxisKind::Value,
        },
        series: vec![SeriesConfig {
            field: y_header.clone(),
            label: y_header.clone(),
            color: Some(CHART_BACKGROUND_COLOR.to_string()),
            series_type: Some(ChartType::Bar.as_str().to_string()),
        }],
        filters: None,
        aggregation: Aggregation::None,
        group_by: None,
        sort_by: None,
        limit: DEFAULT_CHART_LIMIT,
        data: Some(ChartData {
            labels,
            datasets: vec![Dataset {
                label: y_header.clone(),
                data: values,
                background_color: CHART_BACKGROUND_COLOR.to_string(),
                border_color: CHART_BORDER_COLOR.to_string(),
                border_width: CHART_BORDER_WIDTH,
            }],
        }),
    };

    Some(NewChart {
        title: format!("{} - {} vs {}", file.original_name, y_header, x_header),
        description: Some(format!(
            "Auto-generated bar chart from {}",
            file.original_name
        )),
        chart_type: ChartType::Bar,
        config,
        source_file: file.id,
        created_by: file.uploaded_by,
        is_public: false,
        tags: vec![x_header, y_header],
        auto_generated: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use serde_json::json;
    use sheetchart_core::models::NewFile;
    use uuid::Uuid;

    fn text(s: &str) -> CellValue {
        CellValue::Text(s.to_string())
    }

    fn num(n: f64) -> CellValue {
        CellValue::Number(n)
    }

    fn file(name: &str) -> File {
        File::from_new(
            Uuid::new_v4(),
            NewFile {
                filename: "excel-1-1.xlsx".into(),
                original_name: name.into(),
                mimetype: sheetchart_core::constants::XLSX_CONTENT_TYPE.into(),
                size: 10,
                path: "excel-1-1.xlsx".into(),
                uploaded_by: Uuid::new_v4(),
            },
            Utc::now(),
        )
    }

    #[test]
    fn month_revenue_region_example() {
        let sheet = Worksheet::new(
            "Sheet1",
            vec![
                vec![text("Month"), text("Revenue"), text("Region")],
                vec![num(1.0), num(100.0), text("X")],
                vec![num(2.0), num(150.0), text("Y")],
            ],
        );
        let source = file("sales.xlsx");

        assert_eq!(select_axes(&sheet), Some(AxisSelection { x: 0, y: 1 }));

        let chart = infer_chart(&sheet, &source).unwrap();
        assert_eq!(chart.chart_type, ChartType::Bar);
        assert_eq!(chart.title, "sales.xlsx - Revenue vs Month");
        assert_eq!(
            chart.description.as_deref(),
            Some("Auto-generated bar chart from sales.xlsx")
        );
        assert_eq!(chart.tags, vec!["Month", "Revenue"]);
        assert_eq!(chart.source_file, source.id);
        assert_eq!(chart.created_by, source.uploaded_by);
        assert!(chart.auto_generated);
        assert!(!chart.is_public);

        let data = chart.config.data.unwrap();
        assert_eq!(data.labels, vec![json!(1), json!(2)]);
        assert_eq!(data.datasets.len(), 1);
        assert_eq!(data.datasets[0].label, "Revenue");
        assert_eq!(data.datasets[0].data, vec![json!(100), json!(150)]);
        assert_eq!(data.datasets[0].background_color, CHART_BACKGROUND_COLOR);
        assert_eq!(data.datasets[0].border_color, CHART_BORDER_COLOR);
        assert_eq!(chart.config.limit, 1000);
        assert_eq!(chart.config.x_axis.kind, AxisKind::Category);
        assert_eq!(chart.config.y_axis.field, "Revenue");
    }

    #[test]
    fn numeric_columns_are_found_after_text_columns() {
        let sheet = Worksheet::new(
            "Sheet1",
            vec![
                vec![text("Name"), text("Age"), text("City"), text("Score")],
                vec![text("Ann"), num(31.0), text("Oslo"), num(7.5)],
            ],
        );
        assert_eq!(select_axes(&sheet), Some(AxisSelection { x: 1, y: 3 }));
    }

    #[test]
    fn defaults_when_no_numeric_columns() {
        let sheet = Worksheet::new(
            "Sheet1",
            vec![
                vec![text("A"), text("B")],
                vec![text("a"), text("b")],
                vec![text("c"), text("d")],
            ],
        );
        assert_eq!(select_axes(&sheet), Some(AxisSelection { x: 0, y: 1 }));

        let chart = infer_chart(&sheet, &file("t.xlsx")).unwrap();
        let data = chart.config.data.unwrap();
        assert_eq!(data.labels, vec![json!("a"), json!("c")]);
        assert_eq!(data.datasets[0].data, vec![json!("b"), json!("d")]);
    }

    #[test]
    fn single_numeric_column_keeps_default_y() {
        // x lands on column 2, nothing numeric after it, so y falls back to 1
        let sheet = Worksheet::new(
            "Sheet1",
            vec![
                vec![text("A"), text("B"), text("C")],
                vec![text("a"), text("b"), num(3.0)],
            ],
        );
        assert_eq!(select_axes(&sheet), Some(AxisSelection { x: 2, y: 1 }));
    }

    #[test]
    fn date_cells_count_as_numeric() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let sheet = Worksheet::new(
            "Sheet1",
            vec![
                vec![text("Label"), text("Day"), text("Total")],
                vec![text("a"), CellValue::Date(day), num(4.0)],
            ],
        );
        assert_eq!(select_axes(&sheet), Some(AxisSelection { x: 1, y: 2 }));
        let chart = infer_chart(&sheet, &file("d.xlsx")).unwrap();
        assert_eq!(chart.config.data.unwrap().labels, vec![json!("2024-01-01")]);
    }

    #[test]
    fn header_only_or_empty_sheets_produce_nothing() {
        let header_only = Worksheet::new("Sheet1", vec![vec![text("A"), text("B")]]);
        assert!(select_axes(&header_only).is_none());
        assert!(infer_chart(&header_only, &file("h.xlsx")).is_none());
        assert!(infer_chart(&Worksheet::default(), &file("e.xlsx")).is_none());
    }

    #[test]
    fn missing_cells_become_null_and_empty_headers() {
        let sheet = Worksheet::new(
            "Sheet1",
            vec![vec![num(1.0)], vec![num(5.0)], vec![]],
        );
        let chart = infer_chart(&sheet, &file("m.xlsx")).unwrap();
        assert_eq!(chart.title, "m.xlsx -  vs 1");
        assert_eq!(chart.tags, vec!["1".to_string(), String::new()]);
        let data = chart.config.data.unwrap();
        assert_eq!(data.labels, vec![json!(5), json!(null)]);
        assert_eq!(data.datasets[0].data, vec![json!(null), json!(null)]);
    }
}
