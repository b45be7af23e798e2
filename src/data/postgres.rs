//! PostgreSQL implementation of [`FundData`].
//!
//! Every call opens its own connection and closes it afterwards; nothing is
//! pooled and no transaction spans two calls.  The driver is asynchronous, so
//! the adapter owns a current-thread Tokio runtime and blocks on each call.

use chrono::{Local, NaiveDate};
use log::{debug, error, info};
use sqlx::postgres::{PgConnectOptions, PgRow};
use sqlx::{Connection, FromRow, PgConnection};
use tokio::runtime::{Builder, Runtime};

use super::{
    Breakdown, DatedTotal, EffectRow, FundAum, FundData, FundReturn, QueryError, UnclassifiedFund,
};
use crate::config::DatabaseConfig;

/// Positional query parameter.
#[derive(Clone, Debug, PartialEq)]
pub enum SqlParam {
    /// A calendar date.
    Date(NaiveDate),
    /// An integer.
    Int(i64),
}

#[derive(sqlx::FromRow)]
struct LatestDate {
    latest: Option<NaiveDate>,
}

const LATEST_DATE_SQL: &str = "SELECT MAX(fecha_imputada) AS latest FROM fci_diaria_2";

const AUM_HISTORY_SQL: &str = r#"
    SELECT fecha_imputada AS fecha, SUM(patrimonio)::numeric AS total
    FROM report_aum_familia_2
    WHERE fecha_imputada <= $1
    GROUP BY fecha_imputada
    ORDER BY fecha_imputada DESC
    LIMIT $2
"#;

const FAMILY_AUM_HISTORY_SQL: &str = r#"
    SELECT fecha_imputada AS fecha, SUM(patrimonio)::numeric AS total
    FROM report_aum_familia
    WHERE fecha_imputada <= $1
    GROUP BY fecha_imputada
    ORDER BY fecha_imputada DESC
    LIMIT $2
"#;

const SUBSCRIPTION_HISTORY_SQL: &str = r#"
    SELECT eb.fecha_imputada AS fecha,
           SUM(ROUND(eb.es_1d::numeric / 1e6, 0)) AS total
    FROM efectos_base eb
    WHERE eb.fecha_imputada IN (
        SELECT DISTINCT fecha_imputada
        FROM efectos_base_pesos
        ORDER BY fecha_imputada DESC
        LIMIT $1
    )
    GROUP BY eb.fecha_imputada
    ORDER BY eb.fecha_imputada DESC
"#;

const FUND_RETURNS_SQL: &str = r#"
    SELECT fondo,
           patrimonio::numeric AS patrimonio,
           categoria,
           "subCategoria" AS sub_categoria,
           rent_vcp_1d::numeric AS rent_1d,
           rent_vcp_wtd::numeric AS rent_wtd,
           rent_vcp_mtd::numeric AS rent_mtd,
           rent_vcp_1m::numeric AS rent_1m,
           rent_vcp_3m::numeric AS rent_3m,
           rent_vcp_ytd::numeric AS rent_ytd,
           rent_vcp_1y::numeric AS rent_1y
    FROM vista_rentabilidades
    WHERE fecha_imputada = $1
      AND categoria NOT IN ('?', 'Cáscara', 'Basura')
    ORDER BY categoria, "subCategoria", rent_vcp_1d, rent_vcp_wtd, rent_vcp_1m
"#;

const UNCLASSIFIED_FUNDS_SQL: &str = r#"
    SELECT DISTINCT f.fondo
    FROM fci_diaria_2 f
    LEFT JOIN "clasesFCI" c ON f.fondo = c.fondo
    WHERE c.fondo IS NULL
       OR c.familia IS NULL
       OR c.categoria IS NULL
       OR c."subCategoria" IS NULL
    ORDER BY f.fondo
"#;

const AUM_BY_FUND_SQL: &str = r#"
    SELECT fecha_imputada AS fecha,
           familia,
           categoria,
           "subCategoria" AS sub_categoria,
           patrimonio::numeric AS patrimonio,
           gerente
    FROM report_aum_familia
    WHERE fecha_imputada = $1
"#;

fn effects_sql(breakdown: Breakdown) -> String {
    let (source, label, extra_join) = match breakdown {
        Breakdown::Category => ("efectos_intertemp_pesos", "cf.categoria", ""),
        Breakdown::Subcategory => ("efectos_intertemp", r#"cf."subCategoria""#, ""),
        Breakdown::Manager => (
            "efectos_intertemp_pesos",
            "soc.gerente",
            r#"JOIN fci_diaria_2 fci ON fci.fondo = ei.fondo AND fci.fecha_imputada = ei.fecha_imputada
               JOIN sociedades soc ON fci."sociedadGerente" = soc."sociedadGerente""#,
        ),
    };
    let decimals = breakdown.decimals();
    let order = if breakdown.descending() { "DESC" } else { "ASC" };
    let horizon = |column: &str| format!("SUM(ROUND(ei.{column}::numeric / 1e6, {decimals})) AS {column}");

    format!(
        r#"
        SELECT {label} AS label,
               {es_1d}, {es_1w}, {es_mtd}, {es_1m}, {es_3m}, {es_ytd}, {es_1y}
        FROM {source} ei
        JOIN "clasesFCI" cf ON ei.fondo = cf.fondo
            AND (ei.fecha_imputada BETWEEN cf.desde AND COALESCE(cf.hasta, CURRENT_DATE))
        {extra_join}
        WHERE ei.fecha_imputada = $1
        GROUP BY ei.fecha_imputada, {label}
        ORDER BY es_1d {order}
        "#,
        es_1d = horizon("es_1d"),
        es_1w = horizon("es_1w"),
        es_mtd = horizon("es_mtd"),
        es_1m = horizon("es_1m"),
        es_3m = horizon("es_3m"),
        es_ytd = horizon("es_ytd"),
        es_1y = horizon("es_1y"),
    )
}

fn effects_query_name(breakdown: Breakdown) -> &'static str {
    match breakdown {
        Breakdown::Category => "effects_by_category",
        Breakdown::Subcategory => "effects_by_subcategory",
        Breakdown::Manager => "effects_by_manager",
    }
}

/// Returns whether `name` is a plain, optionally schema-qualified, SQL identifier.
pub fn is_procedure_name(name: &str) -> bool {
    !name.is_empty()
        && name.split('.').all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(first) if first.is_ascii_alphabetic() || first == '_')
                && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        })
}

/// Fund data backed by a PostgreSQL database.
pub struct PgDataSource {
    options: PgConnectOptions,
    host: String,
    port: u16,
    runtime: Runtime,
}

impl PgDataSource {
    /// Creates a data source for the configured database.
    ///
    /// No connection is opened until the first query.
    pub fn new(config: &DatabaseConfig) -> Result<Self, QueryError> {
        let runtime = Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(QueryError::Runtime)?;

        Ok(Self {
            options: config.connect_options(),
            host: config.host.clone(),
            port: config.port,
            runtime,
        })
    }

    async fn connect(&self) -> Result<PgConnection, QueryError> {
        PgConnection::connect_with(&self.options)
            .await
            .map_err(|source| QueryError::Connect {
                host: self.host.clone(),
                port: self.port,
                source,
            })
    }

    /// Runs a read-only query on a fresh connection and maps every row into `R`.
    pub fn query<R>(&self, name: &'static str, sql: &str, params: &[SqlParam]) -> Result<Vec<R>, QueryError>
    where
        R: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        debug!("Running query {name} with {} parameter(s)", params.len());
        self.runtime.block_on(async {
            let mut connection = self.connect().await?;

            let mut query = sqlx::query_as::<_, R>(sql);
            for param in params {
                query = match param {
                    SqlParam::Date(value) => query.bind(*value),
                    SqlParam::Int(value) => query.bind(*value),
                };
            }

            let rows = query
                .fetch_all(&mut connection)
                .await
                .map_err(|source| QueryError::Execute { query: name, source })?;

            if let Err(err) = connection.close().await {
                debug!("Closing connection after {name} failed: {err}");
            }
            debug!("Query {name} returned {} row(s)", rows.len());
            Ok(rows)
        })
    }

    /// Calls a stored procedure in autocommit mode.
    ///
    /// Failures are logged and never returned: procedure runs are
    /// fire-and-forget data refresh jobs.
    pub fn invoke_procedure(&self, name: &str) {
        if !is_procedure_name(name) {
            error!("Refusing to call '{name}': not a valid procedure name");
            return;
        }

        info!(
            "Starting procedure {name} at {}",
            Local::now().format("%Y-%m-%d %H:%M:%S")
        );
        let statement = format!("CALL {name}();");
        let outcome = self.runtime.block_on(async {
            let mut connection = self.connect().await?;
            sqlx::query(&statement)
                .execute(&mut connection)
                .await
                .map_err(|source| QueryError::Execute {
                    query: "call_procedure",
                    source,
                })?;
            if let Err(err) = connection.close().await {
                debug!("Closing connection after {name} failed: {err}");
            }
            Ok::<(), QueryError>(())
        });

        match outcome {
            Ok(()) => info!(
                "Procedure {name} finished at {}",
                Local::now().format("%Y-%m-%d %H:%M:%S")
            ),
            Err(err) => error!("Error executing procedure {name}: {err}"),
        }
    }
}

impl FundData for PgDataSource {
    fn latest_snapshot_date(&self) -> Result<Option<NaiveDate>, QueryError> {
        let rows: Vec<LatestDate> = self.query("latest_snapshot_date", LATEST_DATE_SQL, &[])?;
        Ok(rows.into_iter().next().and_then(|row| row.latest))
    }

    fn aum_history(&self, date: NaiveDate, points: u32) -> Result<Vec<DatedTotal>, QueryError> {
        self.query(
            "aum_history",
            AUM_HISTORY_SQL,
            &[SqlParam::Date(date), SqlParam::Int(i64::from(points))],
        )
    }

    fn subscription_history(&self, points: u32) -> Result<Vec<DatedTotal>, QueryError> {
        self.query(
            "subscription_history",
            SUBSCRIPTION_HISTORY_SQL,
            &[SqlParam::Int(i64::from(points))],
        )
    }

    fn subscription_effects(
        &self,
        date: NaiveDate,
        breakdown: Breakdown,
    ) -> Result<Vec<EffectRow>, QueryError> {
        self.query(
            effects_query_name(breakdown),
            &effects_sql(breakdown),
            &[SqlParam::Date(date)],
        )
    }

    fn fund_returns(&self, date: NaiveDate) -> Result<Vec<FundReturn>, QueryError> {
        self.query("fund_returns", FUND_RETURNS_SQL, &[SqlParam::Date(date)])
    }

    fn unclassified_funds(&self) -> Result<Vec<UnclassifiedFund>, QueryError> {
        self.query("unclassified_funds", UNCLASSIFIED_FUNDS_SQL, &[])
    }

    fn aum_by_fund(&self, date: NaiveDate) -> Result<Vec<FundAum>, QueryError> {
        self.query("aum_by_fund", AUM_BY_FUND_SQL, &[SqlParam::Date(date)])
    }

    fn family_aum_history(
        &self,
        date: NaiveDate,
        points: u32,
    ) -> Result<Vec<DatedTotal>, QueryError> {
        self.query(
            "family_aum_history",
            FAMILY_AUM_HISTORY_SQL,
            &[SqlParam::Date(date), SqlParam::Int(i64::from(points))],
        )
    }
}
