//! SQLite-backed ratio store.
//!
//! One `ratios` table with a fixed column set. Appends are plain inserts in a
//! single transaction; there is no uniqueness constraint, so duplicate rows
//! accumulate. Reads come back as polars DataFrames with the stored column
//! names and numeric precision intact.

use crate::error::{Result, StoreError};
use chrono::Utc;
use polars::prelude::*;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Row, params_from_iter};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// SQLite storage type of a stored column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ColumnKind {
    Text,
    Integer,
    Real,
}

impl ColumnKind {
    const fn sql_type(self) -> &'static str {
        match self {
            Self::Text => "TEXT",
            Self::Integer => "INTEGER",
            Self::Real => "REAL",
        }
    }
}

use ColumnKind::{Integer, Real, Text};

/// Fixed column set of the `ratios` table, in storage order.
const STORED_SCHEMA: [(&str, ColumnKind); 34] = [
    ("company", Text),
    ("period", Text),
    ("period_std", Text),
    ("year", Integer),
    ("quarter", Integer),
    ("month", Integer),
    ("revenue", Real),
    ("operating_cash_flow", Real),
    ("total_assets", Real),
    ("total_liabilities", Real),
    ("equity", Real),
    ("current_assets", Real),
    ("current_liabilities", Real),
    ("long_term_liabilities", Real),
    ("inventory", Real),
    ("debt_to_equity", Real),
    ("debt_to_revenue", Real),
    ("current_ratio", Real),
    ("quick_ratio", Real),
    ("short_term_debt_ratio", Real),
    ("long_term_debt_ratio", Real),
    ("short_term_debt_to_equity", Real),
    ("short_term_debt_to_revenue", Real),
    ("long_term_debt_to_equity", Real),
    ("long_term_debt_to_revenue", Real),
    ("receivables_turnover", Real),
    ("payables_turnover", Real),
    ("cash_flow_margin", Real),
    ("equity_ratio", Real),
    ("liabilities_ratio", Real),
    ("roa", Real),
    ("roe", Real),
    ("altman_z_prime", Real),
    ("altman_z_interpretation", Text),
];

/// Stored series level for the SQL variation query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodLevel {
    /// Quarter-over-quarter over rows with a quarter.
    Quarterly,
    /// Year-over-year over rows with a year.
    Yearly,
}

impl PeriodLevel {
    /// Convert to the level string used on the CLI surface.
    pub const fn to_db_str(&self) -> &'static str {
        match self {
            Self::Quarterly => "Q",
            Self::Yearly => "Y",
        }
    }

    /// Parse from a level string.
    pub fn from_db_str(s: &str) -> Result<Self> {
        match s {
            "Q" => Ok(Self::Quarterly),
            "Y" => Ok(Self::Yearly),
            _ => Err(StoreError::Parse(format!("Invalid period level: {}", s))),
        }
    }
}

/// Typed value buffer for one stored column.
#[derive(Debug)]
enum ColumnData {
    Text(Vec<Option<String>>),
    Integer(Vec<Option<i64>>),
    Real(Vec<Option<f64>>),
}

impl ColumnData {
    fn empty(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Text => Self::Text(Vec::new()),
            ColumnKind::Integer => Self::Integer(Vec::new()),
            ColumnKind::Real => Self::Real(Vec::new()),
        }
    }

    /// Extract a stored column from a DataFrame; a column the frame does not
    /// carry is all null.
    fn from_frame(df: &DataFrame, name: &str, kind: ColumnKind) -> Result<Self> {
        let height = df.height();
        let Ok(column) = df.column(name) else {
            return Ok(match kind {
                ColumnKind::Text => Self::Text(vec![None; height]),
                ColumnKind::Integer => Self::Integer(vec![None; height]),
                ColumnKind::Real => Self::Real(vec![None; height]),
            });
        };

        Ok(match kind {
            ColumnKind::Text => {
                let cast = column.cast(&DataType::String)?;
                Self::Text(
                    cast.str()?
                        .into_iter()
                        .map(|v| v.map(str::to_string))
                        .collect(),
                )
            }
            ColumnKind::Integer => {
                let cast = column.cast(&DataType::Int64)?;
                Self::Integer(cast.i64()?.into_iter().collect())
            }
            ColumnKind::Real => {
                let cast = column.cast(&DataType::Float64)?;
                Self::Real(cast.f64()?.into_iter().collect())
            }
        })
    }

    fn value(&self, index: usize) -> SqlValue {
        match self {
            Self::Text(values) => values[index]
                .clone()
                .map_or(SqlValue::Null, SqlValue::Text),
            Self::Integer(values) => values[index].map_or(SqlValue::Null, SqlValue::Integer),
            Self::Real(values) => values[index].map_or(SqlValue::Null, SqlValue::Real),
        }
    }

    fn push_row(&mut self, row: &Row<'_>, index: usize) -> rusqlite::Result<()> {
        match self {
            Self::Text(values) => values.push(row.get(index)?),
            Self::Integer(values) => values.push(row.get(index)?),
            Self::Real(values) => values.push(row.get(index)?),
        }
        Ok(())
    }

    fn into_column(self, name: &str) -> Column {
        match self {
            Self::Text(values) => Series::new(name.into(), values).into(),
            Self::Integer(values) => Series::new(name.into(), values).into(),
            Self::Real(values) => Series::new(name.into(), values).into(),
        }
    }
}

/// Append/query store for ratio rows.
#[derive(Debug)]
pub struct RatioStore {
    conn: Connection,
}

impl RatioStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    fn initialize_schema(&self) -> Result<()> {
        let columns: Vec<String> = STORED_SCHEMA
            .iter()
            .map(|(name, kind)| format!("{name} {}", kind.sql_type()))
            .collect();
        self.conn.execute(
            &format!(
                "CREATE TABLE IF NOT EXISTS ratios ({}, stored_at TEXT NOT NULL)",
                columns.join(", ")
            ),
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_ratios_company_period ON ratios(company, period)",
            [],
        )?;

        Ok(())
    }

    /// Append all rows of a ratio-augmented table.
    ///
    /// Stored columns the table does not carry are inserted as NULL; extra
    /// table columns are ignored. Returns the number of rows appended.
    pub fn append(&self, df: &DataFrame) -> Result<usize> {
        let stored_at = Utc::now().to_rfc3339();
        let columns: Vec<ColumnData> = STORED_SCHEMA
            .iter()
            .map(|(name, kind)| ColumnData::from_frame(df, name, *kind))
            .collect::<Result<_>>()?;

        let names: Vec<&str> = STORED_SCHEMA.iter().map(|(name, _)| *name).collect();
        let placeholders: Vec<String> = (1..=STORED_SCHEMA.len() + 1)
            .map(|i| format!("?{i}"))
            .collect();
        let sql = format!(
            "INSERT INTO ratios ({}, stored_at) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        );

        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(&sql)?;
            for i in 0..df.height() {
                let mut params: Vec<SqlValue> =
                    columns.iter().map(|column| column.value(i)).collect();
                params.push(SqlValue::Text(stored_at.clone()));
                stmt.execute(params_from_iter(params))?;
            }
        }
        tx.commit()?;

        Ok(df.height())
    }

    /// Stored rows for a company, ordered by period, optionally bounded by
    /// period labels (inclusive).
    pub fn series(
        &self,
        company: &str,
        start_period: Option<&str>,
        end_period: Option<&str>,
    ) -> Result<DataFrame> {
        let names: Vec<&str> = STORED_SCHEMA.iter().map(|(name, _)| *name).collect();
        let mut sql = format!("SELECT {} FROM ratios WHERE company = ?1", names.join(", "));
        let mut params: Vec<SqlValue> = vec![SqlValue::Text(company.to_string())];
        if let Some(start) = start_period {
            params.push(SqlValue::Text(start.to_string()));
            sql.push_str(&format!(" AND period >= ?{}", params.len()));
        }
        if let Some(end) = end_period {
            params.push(SqlValue::Text(end.to_string()));
            sql.push_str(&format!(" AND period <= ?{}", params.len()));
        }
        sql.push_str(" ORDER BY company, period");

        self.collect_frame(&sql, params, &STORED_SCHEMA)
    }

    /// Stored-series variation computed in SQL with `LAG` window functions.
    ///
    /// Quarterly: quarter-over-quarter changes of revenue, total liabilities,
    /// equity, current ratio and quick ratio. Yearly: year-over-year changes
    /// of revenue, total liabilities and equity. A NULL or zero previous
    /// value yields a NULL change.
    pub fn sql_variation(&self, company: &str, level: PeriodLevel) -> Result<DataFrame> {
        match level {
            PeriodLevel::Quarterly => self.collect_frame(
                QUARTERLY_VARIATION_SQL,
                vec![SqlValue::Text(company.to_string())],
                &QUARTERLY_VARIATION_SCHEMA,
            ),
            PeriodLevel::Yearly => self.collect_frame(
                YEARLY_VARIATION_SQL,
                vec![SqlValue::Text(company.to_string())],
                &YEARLY_VARIATION_SCHEMA,
            ),
        }
    }

    /// Store statistics.
    pub fn stats(&self) -> Result<StoreStats> {
        let total_rows: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM ratios", [], |row| row.get(0))?;
        let companies: i64 = self.conn.query_row(
            "SELECT COUNT(DISTINCT company) FROM ratios",
            [],
            |row| row.get(0),
        )?;

        Ok(StoreStats {
            total_rows: total_rows as usize,
            companies: companies as usize,
        })
    }

    fn collect_frame(
        &self,
        sql: &str,
        params: Vec<SqlValue>,
        schema: &[(&str, ColumnKind)],
    ) -> Result<DataFrame> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut columns: Vec<ColumnData> = schema
            .iter()
            .map(|(_, kind)| ColumnData::empty(*kind))
            .collect();

        let mut rows = stmt.query(params_from_iter(params))?;
        while let Some(row) = rows.next()? {
            for (index, column) in columns.iter_mut().enumerate() {
                column.push_row(row, index)?;
            }
        }

        let df = DataFrame::new(
            columns
                .into_iter()
                .zip(schema.iter())
                .map(|(column, (name, _))| column.into_column(name))
                .collect(),
        )?;
        Ok(df)
    }
}

/// Store statistics.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Total number of stored rows
    pub total_rows: usize,
    /// Number of distinct companies
    pub companies: usize,
}

const QUARTERLY_VARIATION_SCHEMA: [(&str, ColumnKind); 16] = [
    ("company", Text),
    ("year", Integer),
    ("quarter", Integer),
    ("revenue", Real),
    ("revenue_qoq", Real),
    ("total_liabilities", Real),
    ("debt_qoq", Real),
    ("equity", Real),
    ("equity_qoq", Real),
    ("current_ratio", Real),
    ("current_ratio_qoq", Real),
    ("quick_ratio", Real),
    ("quick_ratio_qoq", Real),
    ("receivables_turnover", Real),
    ("payables_turnover", Real),
    ("altman_z_prime", Real),
];

const QUARTERLY_VARIATION_SQL: &str = "
    WITH base AS (
      SELECT company, period, year, quarter,
             revenue, total_liabilities, equity, current_ratio, quick_ratio,
             receivables_turnover, payables_turnover, altman_z_prime
      FROM ratios
      WHERE company = ?1 AND quarter IS NOT NULL
    ), seq AS (
      SELECT *,
             LAG(revenue) OVER (PARTITION BY company ORDER BY year, quarter) AS revenue_prev,
             LAG(total_liabilities) OVER (PARTITION BY company ORDER BY year, quarter) AS debt_prev,
             LAG(equity) OVER (PARTITION BY company ORDER BY year, quarter) AS equity_prev,
             LAG(current_ratio) OVER (PARTITION BY company ORDER BY year, quarter) AS cr_prev,
             LAG(quick_ratio) OVER (PARTITION BY company ORDER BY year, quarter) AS qr_prev
      FROM base
    )
    SELECT company, year, quarter,
           revenue,
           CASE WHEN revenue_prev IS NOT NULL AND revenue_prev != 0
                THEN (revenue - revenue_prev) / revenue_prev END AS revenue_qoq,
           total_liabilities,
           CASE WHEN debt_prev IS NOT NULL AND debt_prev != 0
                THEN (total_liabilities - debt_prev) / debt_prev END AS debt_qoq,
           equity,
           CASE WHEN equity_prev IS NOT NULL AND equity_prev != 0
                THEN (equity - equity_prev) / equity_prev END AS equity_qoq,
           current_ratio,
           CASE WHEN cr_prev IS NOT NULL AND cr_prev != 0
                THEN (current_ratio - cr_prev) / cr_prev END AS current_ratio_qoq,
           quick_ratio,
           CASE WHEN qr_prev IS NOT NULL AND qr_prev != 0
                THEN (quick_ratio - qr_prev) / qr_prev END AS quick_ratio_qoq,
           receivables_turnover, payables_turnover, altman_z_prime
    FROM seq
    ORDER BY year, quarter";

const YEARLY_VARIATION_SCHEMA: [(&str, ColumnKind); 13] = [
    ("company", Text),
    ("year", Integer),
    ("revenue", Real),
    ("revenue_yoy", Real),
    ("total_liabilities", Real),
    ("debt_yoy", Real),
    ("equity", Real),
    ("equity_yoy", Real),
    ("current_ratio", Real),
    ("quick_ratio", Real),
    ("receivables_turnover", Real),
    ("payables_turnover", Real),
    ("altman_z_prime", Real),
];

const YEARLY_VARIATION_SQL: &str = "
    WITH base AS (
      SELECT company, period, year,
             revenue, total_liabilities, equity, current_ratio, quick_ratio,
             receivables_turnover, payables_turnover, altman_z_prime
      FROM ratios
      WHERE company = ?1 AND year IS NOT NULL
    ), seq AS (
      SELECT *,
             LAG(revenue) OVER (PARTITION BY company ORDER BY year) AS revenue_prev,
             LAG(total_liabilities) OVER (PARTITION BY company ORDER BY year) AS debt_prev,
             LAG(equity) OVER (PARTITION BY company ORDER BY year) AS equity_prev
      FROM base
    )
    SELECT company, year,
           revenue,
           CASE WHEN revenue_prev IS NOT NULL AND revenue_prev != 0
                THEN (revenue - revenue_prev) / revenue_prev END AS revenue_yoy,
           total_liabilities,
           CASE WHEN debt_prev IS NOT NULL AND debt_prev != 0
                THEN (total_liabilities - debt_prev) / debt_prev END AS debt_yoy,
           equity,
           CASE WHEN equity_prev IS NOT NULL AND equity_prev != 0
                THEN (equity - equity_prev) / equity_prev END AS equity_yoy,
           current_ratio, quick_ratio, receivables_turnover, payables_turnover, altman_z_prime
    FROM seq
    ORDER BY year";
