//! Integration tests running the full pipeline into the export/report layer.

use fremantle::{AggMethod, Granularity, add_period_parts, compute_ratios, schema};
use fremantle::{aggregate_by_period, compute_variation};
use fremantle_output::{AnalysisReport, ExportFormat, export_to_string, to_json_records};
use polars::prelude::*;
use serde_json::Value;

fn statement_rows() -> DataFrame {
    df![
        "company" => ["ABC", "ABC", "ABC", "XYZ"],
        "period" => ["2023-Q1", "2023-Q1", "2023-Q2", "2023-Q1"],
        "Doanh thu" => [1_200_000.0, 1_250_000.0, 1_300_000.0, 900_000.0],
        "Tổng tài sản" => [5_000_000.0, 5_100_000.0, 5_200_000.0, 4_000_000.0],
        "Tổng nợ" => [3_000_000.0, 3_020_000.0, 3_050_000.0, 2_200_000.0],
        "Nợ ngắn hạn" => [1_200_000.0, 1_210_000.0, 1_250_000.0, 900_000.0],
        "Vốn chủ sở hữu" => [2_000_000.0, 2_080_000.0, 2_150_000.0, 1_800_000.0],
        "Tài sản ngắn hạn" => [2_000_000.0, 2_050_000.0, 2_100_000.0, 1_600_000.0],
        "EBIT" => [250_000.0, 260_000.0, 270_000.0, 180_000.0],
        "Lợi nhuận sau thuế" => [180_000.0, 185_000.0, 190_000.0, 120_000.0]
    ]
    .unwrap()
}

#[test]
fn test_full_analyze_workflow() {
    let input = statement_rows();
    let mapping = schema::column_mapping(&input);
    let ratios = compute_ratios(input).unwrap();

    let report = AnalysisReport::from_ratios(&mapping, &ratios).unwrap();
    assert_eq!(report.records_analyzed, 4);
    assert!(report.summary.avg_debt_to_equity.is_some());
    assert_eq!(
        report.mapping.get("Doanh thu").map(String::as_str),
        Some("revenue")
    );
    assert_eq!(report.risk_analysis.len(), 1);

    let text = report.to_string();
    assert!(text.contains("Records analyzed:     4"));
}

#[test]
fn test_full_trends_workflow_serializes_null_safe() {
    let ratios = compute_ratios(statement_rows()).unwrap();
    let ratios = add_period_parts(ratios).unwrap();
    let series =
        aggregate_by_period(ratios, Granularity::Quarterly, AggMethod::Mean).unwrap();
    let series = compute_variation(series, Granularity::Quarterly).unwrap();

    let records = to_json_records(&series).unwrap();
    assert_eq!(records.len(), 3);

    // First ABC quarter has no previous period: change must be JSON null.
    let first = &records[0];
    assert_eq!(first["company"], Value::String("ABC".to_string()));
    assert_eq!(first["revenue_chg_1"], Value::Null);

    // Second ABC quarter has a real sequential change.
    let second = &records[1];
    assert!(second["revenue_chg_1"].is_number());
}

#[test]
fn test_full_export_workflow_keeps_column_order() {
    let ratios = compute_ratios(statement_rows()).unwrap();
    let ratios = add_period_parts(ratios).unwrap();

    let csv = export_to_string(&ratios, ExportFormat::Csv).unwrap();
    let header = csv.lines().next().unwrap();
    assert!(header.starts_with("company,period,year,quarter,month,revenue"));
    assert!(header.ends_with("altman_z_prime,altman_z_interpretation"));

    let json = export_to_string(&ratios, ExportFormat::PrettyJson).unwrap();
    assert!(json.contains("\"debt_to_equity\""));
}
