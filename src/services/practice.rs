use crate::db::{RecordStore, Table};
use crate::models::PracticeProfile;

const PLACEHOLDER_KEYS: &[&str] = &["", "unknown", "null", "none", "function_call"];

fn is_placeholder(key: &str) -> bool {
    let key = key.trim();
    PLACEHOLDER_KEYS.contains(&key.to_lowercase().as_str())
        || (key.starts_with("{{") && key.ends_with("}}"))
}

fn looks_like_phone(key: &str) -> bool {
    if key.starts_with('+') {
        return true;
    }
    let digits: String = key.chars().filter(|c| *c != '-' && *c != ' ').collect();
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}

/// Looks up the practice behind a call. Phone-number keys filter by the
/// practice's number; other keys match a practice id and otherwise fall back
/// to the first practice on file. Store failures are logged and yield `None`.
pub fn resolve_practice(store: &dyn RecordStore, key: Option<&str>) -> Option<PracticeProfile> {
    let key = key.map(str::trim).filter(|k| !is_placeholder(k));

    let rows = match key {
        Some(number) if looks_like_phone(number) => {
            store.select(Table::Tenants, &[("phone_number", number)], Some(1))
        }
        Some(other) => store
            .select(Table::Tenants, &[("id", other)], Some(1))
            .and_then(|rows| {
                if rows.is_empty() {
                    tracing::debug!(key = other, "practice key matched no id, using default practice");
                    store.select(Table::Tenants, &[], Some(1))
                } else {
                    Ok(rows)
                }
            }),
        None => store.select(Table::Tenants, &[], Some(1)),
    };

    match rows {
        Ok(rows) => {
            let profile = rows.first().map(PracticeProfile::from_record);
            if profile.is_none() {
                tracing::warn!(key = ?key, "no practice found for call");
            }
            profile
        }
        Err(e) => {
            tracing::error!(error = %e, key = ?key, "failed to load practice profile");
            None
        }
    }
}

pub fn list_practices(store: &dyn RecordStore) -> anyhow::Result<Vec<PracticeProfile>> {
    Ok(store
        .select(Table::Tenants, &[], None)?
        .iter()
        .map(PracticeProfile::from_record)
        .collect())
}

pub fn create_practice(
    store: &dyn RecordStore,
    mut profile: PracticeProfile,
) -> anyhow::Result<PracticeProfile> {
    if profile.practice_id.is_empty() {
        profile.practice_id = uuid::Uuid::new_v4().to_string();
    }
    store.insert(Table::Tenants, profile.to_record())?;
    tracing::info!(practice_id = %profile.practice_id, name = %profile.name, "created practice");
    Ok(profile)
}
