use diesel::prelude::*;
use diesel_async::RunQueryDsl;
use tracing::debug;

use super::schema::members;
use super::{inserted, new_id, not_found, CareStore};
use crate::db::{decode_list, encode_list, from_millis, now_ms, to_millis};
use crate::error::{ChronicleError, Result};
use crate::models::{EngagementLevel, Member, MemberUpdate, NewMember};

#[derive(Queryable, Selectable)]
#[diesel(table_name = members)]
pub(super) struct MemberRow {
    id: String,
    name: String,
    email: String,
    phone: String,
    date_of_birth: Option<i64>,
    profile_image: Option<String>,
    gender: Option<String>,
    address: Option<String>,
    emergency_contact: Option<String>,
    insurance_info: Option<String>,
    health_goals: String,
    current_conditions: String,
    medications: String,
    allergies: String,
    communication_preference: String,
    time_zone: String,
    preferred_contact_time: String,
    join_date: i64,
    last_active: i64,
    engagement_level: String,
    plan_adherence: i32,
    created_at: i64,
    updated_at: i64,
}

#[derive(Insertable)]
#[diesel(table_name = members)]
struct NewMemberRow {
    id: String,
    name: String,
    email: String,
    phone: String,
    date_of_birth: Option<i64>,
    profile_image: Option<String>,
    gender: Option<String>,
    address: Option<String>,
    emergency_contact: Option<String>,
    insurance_info: Option<String>,
    health_goals: String,
    current_conditions: String,
    medications: String,
    allergies: String,
    communication_preference: String,
    time_zone: String,
    preferred_contact_time: String,
    join_date: i64,
    last_active: i64,
    engagement_level: String,
    plan_adherence: i32,
    created_at: i64,
    updated_at: i64,
}

#[derive(AsChangeset)]
#[diesel(table_name = members)]
struct MemberChangeset {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    date_of_birth: Option<Option<i64>>,
    profile_image: Option<Option<String>>,
    gender: Option<Option<String>>,
    address: Option<Option<String>>,
    emergency_contact: Option<Option<String>>,
    insurance_info: Option<Option<String>>,
    health_goals: Option<String>,
    current_conditions: Option<String>,
    medications: Option<String>,
    allergies: Option<String>,
    communication_preference: Option<String>,
    time_zone: Option<String>,
    preferred_contact_time: Option<String>,
    join_date: Option<i64>,
    last_active: Option<i64>,
    engagement_level: Option<String>,
    plan_adherence: Option<i32>,
    updated_at: i64,
}

impl CareStore {
    pub async fn create_member(&self, input: NewMember) -> Result<Member> {
        input.validate()?;
        let now = now_ms();
        let row = NewMemberRow {
            id: new_id(input.id),
            name: input.name.trim().to_string(),
            email: input.email.trim().to_string(),
            phone: input.phone.unwrap_or_default().trim().to_string(),
            date_of_birth: input.date_of_birth.map(to_millis),
            profile_image: input.profile_image,
            gender: input.gender,
            address: input.address,
            emergency_contact: input.emergency_contact,
            insurance_info: input.insurance_info,
            health_goals: encode_list(&input.health_goals)?,
            current_conditions: encode_list(&input.current_conditions)?,
            medications: encode_list(&input.medications)?,
            allergies: encode_list(&input.allergies)?,
            communication_preference: input
                .communication_preference
                .unwrap_or_else(|| "email".to_string()),
            time_zone: input.time_zone.unwrap_or_else(|| "UTC".to_string()),
            preferred_contact_time: input
                .preferred_contact_time
                .unwrap_or_else(|| "morning".to_string()),
            join_date: input.join_date.map(to_millis).unwrap_or(now),
            last_active: input.last_active.map(to_millis).unwrap_or(now),
            engagement_level: input
                .engagement_level
                .unwrap_or_default()
                .as_str()
                .to_string(),
            plan_adherence: input.plan_adherence.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        let id = row.id.clone();

        let mut conn = self.conn().await?;
        diesel::insert_into(members::table)
            .values(&row)
            .execute(&mut conn)
            .await?;
        debug!(member_id = %id, "member created");
        drop(conn);
        self.get_member(&id).await
    }

    pub async fn get_member(&self, id: &str) -> Result<Member> {
        let mut conn = self.conn().await?;
        let row: Option<MemberRow> = members::table
            .filter(members::id.eq(id))
            .select(MemberRow::as_select())
            .first(&mut conn)
            .await
            .optional()?;
        row.map(map_row).ok_or_else(|| not_found("Member"))
    }

    /// Most recently active first.
    pub async fn list_members(&self, limit: Option<i64>) -> Result<Vec<Member>> {
        let mut conn = self.conn().await?;
        let mut query = members::table
            .select(MemberRow::as_select())
            .order(members::last_active.desc())
            .then_order_by(inserted("members").asc())
            .into_boxed();
        if let Some(limit) = limit {
            query = query.limit(limit.max(0));
        }
        let rows: Vec<MemberRow> = query.load(&mut conn).await?;
        Ok(rows.into_iter().map(map_row).collect())
    }

    pub async fn update_member(&self, id: &str, input: MemberUpdate) -> Result<Member> {
        input.validate()?;
        let changes = MemberChangeset {
            name: input.name.map(|v| v.trim().to_string()),
            email: input.email.map(|v| v.trim().to_string()),
            phone: input.phone,
            date_of_birth: input.date_of_birth.map(|v| v.map(to_millis)),
            profile_image: input.profile_image,
            gender: input.gender,
            address: input.address,
            emergency_contact: input.emergency_contact,
            insurance_info: input.insurance_info,
            health_goals: input.health_goals.as_deref().map(encode_list).transpose()?,
            current_conditions: input
                .current_conditions
                .as_deref()
                .map(encode_list)
                .transpose()?,
            medications: input.medications.as_deref().map(encode_list).transpose()?,
            allergies: input.allergies.as_deref().map(encode_list).transpose()?,
            communication_preference: input.communication_preference,
            time_zone: input.time_zone,
            preferred_contact_time: input.preferred_contact_time,
            join_date: input.join_date.map(to_millis),
            last_active: input.last_active.map(to_millis),
            engagement_level: input.engagement_level.map(|v| v.as_str().to_string()),
            plan_adherence: input.plan_adherence,
            updated_at: now_ms(),
        };

        let mut conn = self.conn().await?;
        let count = diesel::update(members::table.filter(members::id.eq(id)))
            .set(&changes)
            .execute(&mut conn)
            .await?;
        if count == 0 {
            return Err(not_found("Member"));
        }
        drop(conn);
        self.get_member(id).await
    }

    /// Fails with `Constraint` while the member still owns metrics,
    /// episodes or conversations.
    pub async fn delete_member(&self, id: &str) -> Result<()> {
        let mut conn = self.conn().await?;
        let count = diesel::delete(members::table.filter(members::id.eq(id)))
            .execute(&mut conn)
            .await
            .map_err(|e| match ChronicleError::from(e) {
                ChronicleError::Constraint(message) => ChronicleError::Constraint(format!(
                    "member {id} still has health metrics, episodes or conversations: {message}"
                )),
                other => other,
            })?;
        if count == 0 {
            return Err(not_found("Member"));
        }
        debug!(member_id = %id, "member deleted");
        Ok(())
    }
}

pub(super) fn map_row(row: MemberRow) -> Member {
    Member {
        id: row.id,
        name: row.name,
        email: row.email,
        phone: row.phone,
        date_of_birth: row.date_of_birth.map(from_millis),
        profile_image: row.profile_image,
        gender: row.gender,
        address: row.address,
        emergency_contact: row.emergency_contact,
        insurance_info: row.insurance_info,
        health_goals: decode_list(&row.health_goals),
        current_conditions: decode_list(&row.current_conditions),
        medications: decode_list(&row.medications),
        allergies: decode_list(&row.allergies),
        communication_preference: row.communication_preference,
        time_zone: row.time_zone,
        preferred_contact_time: row.preferred_contact_time,
        join_date: from_millis(row.join_date),
        last_active: from_millis(row.last_active),
        engagement_level: EngagementLevel::from_db(&row.engagement_level),
        plan_adherence: row.plan_adherence,
        created_at: from_millis(row.created_at),
        updated_at: from_millis(row.updated_at),
    }
}
