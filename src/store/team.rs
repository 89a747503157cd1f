use diesel::prelude::*;
use diesel_async::RunQueryDsl;

use super::schema::team_members;
use super::{inserted, new_id, CareStore};
use crate::db::{decode_list, encode_list, from_millis, now_ms};
use crate::error::Result;
use crate::models::{NewTeamMember, TeamMember, TeamRole};

#[derive(Queryable, Selectable)]
#[diesel(table_name = team_members)]
struct TeamMemberRow {
    id: String,
    name: String,
    role: String,
    title: String,
    avatar: Option<String>,
    communication_style: String,
    expertise: String,
    is_online: bool,
    response_time: i32,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = team_members)]
struct NewTeamMemberRow {
    id: String,
    name: String,
    role: String,
    title: String,
    avatar: Option<String>,
    communication_style: String,
    expertise: String,
    is_online: bool,
    response_time: i32,
    created_at: i64,
    updated_at: i64,
}

impl CareStore {
    pub async fn create_team_member(&self, input: NewTeamMember) -> Result<TeamMember> {
        input.validate()?;
        let now = now_ms();
        let row = NewTeamMemberRow {
            id: new_id(input.id),
            name: input.name.trim().to_string(),
            role: input.role.as_str().to_string(),
            title: input.title,
            avatar: input.avatar,
            communication_style: input.communication_style,
            expertise: encode_list(&input.expertise)?,
            is_online: input.is_online,
            response_time: input.response_time,
            created_at: now,
            updated_at: now,
        };
        let id = row.id.clone();

        let mut conn = self.conn().await?;
        diesel::insert_into(team_members::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        let created: TeamMemberRow = team_members::table
            .filter(team_members::id.eq(&id))
            .select(TeamMemberRow::as_select())
            .first(&mut conn)
            .await?;
        Ok(map_row(created))
    }

    /// Newest first.
    pub async fn list_team_members(&self, limit: i64) -> Result<Vec<TeamMember>> {
        let mut conn = self.conn().await?;
        let rows: Vec<TeamMemberRow> = team_members::table
            .select(TeamMemberRow::as_select())
            .order((team_members::created_at.desc(), inserted("team_members").asc()))
            .limit(limit.max(0))
            .load(&mut conn)
            .await?;
        Ok(rows.into_iter().map(map_row).collect())
    }
}

fn map_row(row: TeamMemberRow) -> TeamMember {
    TeamMember {
        id: row.id,
        name: row.name,
        role: TeamRole::from_db(&row.role),
        title: row.title,
        avatar: row.avatar,
        communication_style: row.communication_style,
        expertise: decode_list(&row.expertise),
        is_online: row.is_online,
        response_time: row.response_time,
        created_at: from_millis(row.created_at),
        updated_at: from_millis(row.updated_at),
    }
}
