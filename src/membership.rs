//! Team leadership: every team with members keeps at least one member whose
//! role is Manager, Director or Admin.

use sqlx::{Postgres, Transaction};
use uuid::Uuid;

use crate::db;
use crate::error::AppError;
use crate::models::Role;

fn has_leader(roles: &[Role]) -> bool {
    roles.iter().any(Role::is_leader)
}

/// Validate moving a profile from `current_team` to `team` with `role`.
///
/// `destination_others` and `source_others` are the roles of the other
/// members of `team` and `current_team`.
pub fn check_assignment(
    current_team: Option<Uuid>,
    team: Option<Uuid>,
    role: Role,
    destination_others: &[Role],
    source_others: &[Role],
) -> Result<(), String> {
    if team.is_some() && !role.is_leader() && !has_leader(destination_others) {
        return Err(
            "This team needs a Manager, Director or Admin. Assign a leader to the team first."
                .to_string(),
        );
    }

    if current_team.is_some()
        && current_team != team
        && !source_others.is_empty()
        && !has_leader(source_others)
    {
        return Err(
            "The current team would be left without a Manager, Director or Admin.".to_string(),
        );
    }

    Ok(())
}

/// Save a profile's team and role, enforcing the leadership rule under row locks.
/// Violations are returned as `AppError::BadRequest`.
pub async fn assign(
    tx: &mut Transaction<'_, Postgres>,
    profile_id: Uuid,
    team: Option<Uuid>,
    role: Role,
) -> Result<(), AppError> {
    let current: Option<(Option<Uuid>,)> =
        sqlx::query_as("SELECT team_id FROM user_profiles WHERE id = $1 FOR UPDATE")
            .bind(profile_id)
            .fetch_optional(&mut **tx)
            .await?;
    let Some((current_team,)) = current else {
        return Err(AppError::NotFound("Profile not found".to_string()));
    };

    let mut locked: Vec<Uuid> = current_team.into_iter().chain(team).collect();
    locked.sort();
    locked.dedup();
    db::teams::lock(&mut **tx, &locked).await?;

    let destination_others = match team {
        Some(team_id) => db::profiles::other_member_roles(&mut **tx, team_id, profile_id).await?,
        None => Vec::new(),
    };
    let source_others = match current_team {
        Some(team_id) if current_team != team => {
            db::profiles::other_member_roles(&mut **tx, team_id, profile_id).await?
        }
        _ => Vec::new(),
    };

    check_assignment(current_team, team, role, &destination_others, &source_others)
        .map_err(AppError::BadRequest)?;

    db::profiles::update_assignment(&mut **tx, profile_id, team, role).await?;
    Ok(())
}
