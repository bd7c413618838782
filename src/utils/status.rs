//! Rotating bot presence.

use poise::serenity_prelude::{self as serenity, ActivityData, OnlineStatus};
use rand::Rng;
use rand::seq::SliceRandom;
use std::time::Duration;
use tracing::{debug, info};

use super::config::{ActivityKind, PresenceStatus, StatusActivity, StatusOptions};

pub fn activity_data(activity: &StatusActivity) -> ActivityData {
    match activity.kind {
        ActivityKind::Playing => ActivityData::playing(&activity.name),
        ActivityKind::Listening => ActivityData::listening(&activity.name),
        ActivityKind::Watching => ActivityData::watching(&activity.name),
        ActivityKind::Competing => ActivityData::competing(&activity.name),
    }
}

pub fn online_status(status: PresenceStatus) -> OnlineStatus {
    match status {
        PresenceStatus::Online => OnlineStatus::Online,
        PresenceStatus::Idle => OnlineStatus::Idle,
        PresenceStatus::Dnd => OnlineStatus::DoNotDisturb,
        PresenceStatus::Invisible => OnlineStatus::Invisible,
    }
}

/// Activities in the order of one rotation.
pub fn rotation<R: Rng + ?Sized>(options: &StatusOptions, rng: &mut R) -> Vec<StatusActivity> {
    let mut activities = options.activities.clone();
    if options.shuffle {
        activities.shuffle(rng);
    }
    activities
}

fn apply(ctx: &serenity::Context, activity: &StatusActivity) {
    debug!("Setting presence to {:?} {}", activity.kind, activity.name);
    ctx.set_presence(Some(activity_data(activity)), online_status(activity.status));
}

/// Shortest rotation period; a zero interval would spin.
const MIN_CHANGE_INTERVAL: Duration = Duration::from_secs(1);

fn change_interval(options: &StatusOptions) -> Duration {
    options.change_interval.max(MIN_CHANGE_INTERVAL)
}

/// Applies the configured presence. With several activities, a background
/// task keeps cycling through them every `change_interval`.
pub fn start(ctx: serenity::Context, options: StatusOptions) {
    match options.activities.as_slice() {
        [] => {}
        [single] => apply(&ctx, single),
        _ => {
            info!(
                "Rotating {} activities every {:?}",
                options.activities.len(),
                change_interval(&options)
            );
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(change_interval(&options));
                loop {
                    let activities = rotation(&options, &mut rand::rng());
                    for activity in &activities {
                        interval.tick().await;
                        apply(&ctx, activity);
                    }
                }
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use poise::serenity_prelude::ActivityType;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn activity(kind: ActivityKind, name: &str) -> StatusActivity {
        StatusActivity {
            kind,
            name: name.to_string(),
            status: PresenceStatus::Online,
        }
    }

    #[test]
    fn test_activity_data() {
        let data = activity_data(&activity(ActivityKind::Listening, "Music"));
        assert_eq!(data.name, "Music");
        assert_eq!(data.kind, ActivityType::Listening);
    }

    #[test]
    fn test_online_status() {
        assert_eq!(online_status(PresenceStatus::Dnd), OnlineStatus::DoNotDisturb);
        assert_eq!(online_status(PresenceStatus::Online), OnlineStatus::Online);
    }

    #[test]
    fn test_rotation_keeps_order_unless_shuffled() {
        let mut options = StatusOptions {
            activities: (0..20)
                .map(|i| activity(ActivityKind::Playing, &i.to_string()))
                .collect(),
            ..Default::default()
        };
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(rotation(&options, &mut rng), options.activities);

        options.shuffle = true;
        let mut shuffled: Vec<String> = rotation(&options, &mut rng)
            .into_iter()
            .map(|activity| activity.name)
            .collect();
        shuffled.sort();
        let mut names: Vec<String> = options.activities.iter().map(|a| a.name.clone()).collect();
        names.sort();
        assert_eq!(shuffled, names);
    }

    #[test]
    fn test_zero_change_interval_is_clamped() {
        let mut options = StatusOptions {
            change_interval: Duration::ZERO,
            ..Default::default()
        };
        assert_eq!(change_interval(&options), Duration::from_secs(1));

        options.change_interval = Duration::from_secs(30);
        assert_eq!(change_interval(&options), Duration::from_secs(30));
    }
}
