use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::metrics::summary;
use super::schema::{episodes, members};
use super::{inserted, new_id, not_found, CareStore};
use crate::db::{decode_list, encode_list, from_millis, now_ms, to_millis};
use crate::error::Result;
use crate::models::{
    Episode, EpisodeStatus, EpisodeUpdate, EpisodeWithMember, NewEpisode, Priority,
};

#[derive(Queryable, Selectable)]
#[diesel(table_name = episodes)]
pub(super) struct EpisodeRow {
    id: String,
    member_id: String,
    title: String,
    description: String,
    category: String,
    priority: String,
    status: String,
    initiated_by: String,
    assigned_to: Option<String>,
    start_date: i64,
    end_date: Option<i64>,
    interventions: String,
    outcomes: String,
    friction_points: String,
    tags: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = episodes)]
struct NewEpisodeRow {
    id: String,
    member_id: String,
    title: String,
    description: String,
    category: String,
    priority: String,
    status: String,
    initiated_by: String,
    assigned_to: Option<String>,
    start_date: i64,
    end_date: Option<i64>,
    interventions: String,
    outcomes: String,
    friction_points: String,
    tags: String,
    created_at: i64,
    updated_at: i64,
}

#[derive(AsChangeset)]
#[diesel(table_name = episodes)]
struct EpisodeChangeset {
    title: Option<String>,
    description: Option<String>,
    category: Option<String>,
    priority: Option<String>,
    status: Option<String>,
    assigned_to: Option<Option<String>>,
    start_date: Option<i64>,
    end_date: Option<Option<i64>>,
    interventions: Option<String>,
    outcomes: Option<String>,
    friction_points: Option<String>,
    tags: Option<String>,
    updated_at: i64,
}

impl CareStore {
    pub async fn create_episode(&self, input: NewEpisode) -> Result<Episode> {
        input.validate()?;
        let now = now_ms();
        let row = NewEpisodeRow {
            id: new_id(input.id),
            member_id: input.member_id.trim().to_string(),
            title: input.title.trim().to_string(),
            description: input.description,
            category: input.category.unwrap_or_else(|| "general".to_string()),
            priority: input.priority.unwrap_or_default().as_str().to_string(),
            status: input.status.unwrap_or_default().as_str().to_string(),
            initiated_by: input.initiated_by.unwrap_or_else(|| "team".to_string()),
            assigned_to: input.assigned_to.filter(|id| !id.trim().is_empty()),
            start_date: input.start_date.map(to_millis).unwrap_or(now),
            end_date: input.end_date.map(to_millis),
            interventions: encode_list(&input.interventions)?,
            outcomes: encode_list(&input.outcomes)?,
            friction_points: encode_list(&input.friction_points)?,
            tags: encode_list(&input.tags)?,
            created_at: now,
            updated_at: now,
        };
        let id = row.id.clone();

        let mut conn = self.conn().await?;
        diesel::insert_into(episodes::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        debug!(episode_id = %id, "episode created");
        drop(conn);
        self.get_episode(&id).await
    }

    pub async fn get_episode(&self, id: &str) -> Result<Episode> {
        let mut conn = self.conn().await?;
        let row: Option<EpisodeRow> = episodes::table
            .filter(episodes::id.eq(id))
            .select(EpisodeRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        row.map(map_row).ok_or_else(|| not_found("Episode"))
    }

    pub async fn update_episode(&self, id: &str, input: EpisodeUpdate) -> Result<Episode> {
        input.validate()?;
        let changes = EpisodeChangeset {
            title: input.title.map(|v| v.trim().to_string()),
            description: input.description,
            category: input.category,
            priority: input.priority.map(|v| v.as_str().to_string()),
            status: input.status.map(|v| v.as_str().to_string()),
            assigned_to: input.assigned_to,
            start_date: input.start_date.map(to_millis),
            end_date: input.end_date.map(|v| v.map(to_millis)),
            interventions: input.interventions.as_deref().map(encode_list).transpose()?,
            outcomes: input.outcomes.as_deref().map(encode_list).transpose()?,
            friction_points: input
                .friction_points
                .as_deref()
                .map(encode_list)
                .transpose()?,
            tags: input.tags.as_deref().map(encode_list).transpose()?,
            updated_at: now_ms(),
        };

        let mut conn = self.conn().await?;
        let count = diesel::update(episodes::table.filter(episodes::id.eq(id)))
            .set(&changes)
            .execute(&mut conn)
            .await?;
        if count == 0 {
            return Err(not_found("Episode"));
        }
        drop(conn);
        self.get_episode(id).await
    }

    /// Newest first, each with its member's summary.
    pub async fn list_episodes(&self, limit: i64) -> Result<Vec<EpisodeWithMember>> {
        let mut conn = self.conn().await?;
        let rows: Vec<(EpisodeRow, (String, String, String, Option<String>))> = episodes::table
            .inner_join(members::table)
            .select((
                EpisodeRow::as_select(),
                (
                    members::id,
                    members::name,
                    members::email,
                    members::profile_image,
                ),
            ))
            .order((episodes::created_at.desc(), inserted("episodes").asc()))
            .limit(limit.max(0))
            .load(&mut conn)
            .await?;
        Ok(rows
            .into_iter()
            .map(|(episode, member)| EpisodeWithMember {
                episode: map_row(episode),
                member: summary(member),
            })
            .collect())
    }

    pub async fn member_episodes(&self, member_id: &str) -> Result<Vec<Episode>> {
        let mut conn = self.conn().await?;
        let rows: Vec<EpisodeRow> = episodes::table
            .filter(episodes::member_id.eq(member_id))
            .select(EpisodeRow::as_select())
            .order((episodes::created_at.desc(), inserted("episodes").asc()))
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(map_row).collect())
    }

    /// Every episode, newest first.
    pub async fn all_episodes(&self) -> Result<Vec<Episode>> {
        let mut conn = self.conn().await?;
        let rows: Vec<EpisodeRow> = episodes::table
            .select(EpisodeRow::as_select())
            .order((episodes::created_at.desc(), inserted("episodes").asc()))
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(map_row).collect())
    }
}

fn map_row(row: EpisodeRow) -> Episode {
    Episode {
        id: row.id,
        member_id: row.member_id,
        title: row.title,
        description: row.description,
        category: row.category,
        priority: Priority::from_db(&row.priority),
        status: EpisodeStatus::from_db(&row.status),
        initiated_by: row.initiated_by,
        assigned_to: row.assigned_to,
        start_date: from_millis(row.start_date),
        end_date: row.end_date.map(from_millis),
        interventions: decode_list(&row.interventions),
        outcomes: decode_list(&row.outcomes),
        friction_points: decode_list(&row.friction_points),
        tags: decode_list(&row.tags),
        created_at: from_millis(row.created_at),
        updated_at: from_millis(row.updated_at),
    }
}
