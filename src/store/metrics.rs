use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::schema::{health_metrics, members};
use super::{inserted, new_id, not_found, CareStore};
use crate::db::{from_millis, now_ms, to_millis};
use crate::error::Result;
use crate::models::{HealthMetric, HealthMetricWithMember, MemberSummary, NewHealthMetric};

#[derive(Queryable, Selectable)]
#[diesel(table_name = health_metrics)]
pub(super) struct MetricRow {
    id: String,
    member_id: String,
    metric_type: String,
    value: String,
    unit: String,
    timestamp: i64,
    source: String,
    notes: Option<String>,
    created_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = health_metrics)]
struct NewMetricRow {
    id: String,
    member_id: String,
    metric_type: String,
    value: String,
    unit: String,
    timestamp: i64,
    source: String,
    notes: Option<String>,
    created_at: i64,
}

type SummaryColumns = (String, String, String, Option<String>);

impl CareStore {
    pub async fn create_health_metric(&self, input: NewHealthMetric) -> Result<HealthMetric> {
        input.validate()?;
        let now = now_ms();
        let row = NewMetricRow {
            id: new_id(input.id),
            member_id: input.member_id.trim().to_string(),
            metric_type: input.metric_type.trim().to_string(),
            value: input.value.trim().to_string(),
            unit: input.unit,
            timestamp: input.timestamp.map(to_millis).unwrap_or(now),
            source: input.source.unwrap_or_else(|| "manual".to_string()),
            notes: input.notes,
            created_at: now,
        };
        let id = row.id.clone();

        let mut conn = self.conn().await?;
        diesel::insert_into(health_metrics::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        let created: MetricRow = health_metrics::table
            .filter(health_metrics::id.eq(&id))
            .select(MetricRow::as_select())
            .first(&mut conn)
            .await?;
        debug!(metric_id = %id, member_id = %created.member_id, "health metric created");
        Ok(map_row(created))
    }

    pub async fn delete_health_metric(&self, id: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let count = diesel::delete(health_metrics::table.filter(health_metrics::id.eq(id)))
            .execute(&mut conn)
            .await?;
        if count == 0 {
            return Err(not_found("Health metric"));
        }
        Ok(())
    }

    /// Newest first, each with its member's summary.
    pub async fn list_health_metrics(&self, limit: i64) -> Result<Vec<HealthMetricWithMember>> {
        let mut conn = self.conn().await?;
        let rows: Vec<(MetricRow, SummaryColumns)> = health_metrics::table
            .inner_join(members::table)
            .select((
                MetricRow::as_select(),
                (
                    members::id,
                    members::name,
                    members::email,
                    members::profile_image,
                ),
            ))
            .order((
                health_metrics::timestamp.desc(),
                inserted("health_metrics").asc(),
            ))
            .limit(limit.max(0))
            .load(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(metric, member)| HealthMetricWithMember {
                metric: map_row(metric),
                member: summary(member),
            })
            .collect())
    }

    pub async fn member_health_metrics(
        &self,
        member_id: &str,
        metric_type: Option<&str>,
        limit: Option<i64>,
    ) -> Result<Vec<HealthMetric>> {
        let mut conn = self.conn().await?;
        let mut query = health_metrics::table
            .filter(health_metrics::member_id.eq(member_id))
            .select(MetricRow::as_select())
            .order((
                health_metrics::timestamp.desc(),
                inserted("health_metrics").asc(),
            ))
            .into_boxed();
        if let Some(metric_type) = metric_type.map(str::trim).filter(|t| !t.is_empty()) {
            query = query.filter(health_metrics::metric_type.eq(metric_type));
        }
        if let Some(limit) = limit {
            query = query.limit(limit.max(0));
        }
        let rows: Vec<MetricRow> = query.load(&mut conn).await?;
        Ok(rows.into_iter().map(map_row).collect())
    }

    /// Every metric, newest first.
    pub async fn all_health_metrics(&self) -> Result<Vec<HealthMetric>> {
        let mut conn = self.conn().await?;
        let rows: Vec<MetricRow> = health_metrics::table
            .select(MetricRow::as_select())
            .order((
                health_metrics::timestamp.desc(),
                inserted("health_metrics").asc(),
            ))
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(map_row).collect())
    }
}

pub(super) fn summary((id, name, email, profile_image): SummaryColumns) -> MemberSummary {
    MemberSummary {
        id,
        name,
        email,
        profile_image,
    }
}

pub(super) fn map_row(row: MetricRow) -> HealthMetric {
    HealthMetric {
        id: row.id,
        member_id: row.member_id,
        metric_type: row.metric_type,
        value: row.value,
        unit: row.unit,
        timestamp: from_millis(row.timestamp),
        source: row.source,
        notes: row.notes,
        created_at: from_millis(row.created_at),
    }
}
