use poise::serenity_prelude::{ChannelId, GuildId, Permissions, RoleId, UserId};

use super::Record;
use crate::utils::database::{Database, DbError};

/// The parts of a guild member the DJ policy looks at.
#[derive(Debug, Clone)]
pub struct DjCandidate {
    pub user_id: UserId,
    pub roles: Vec<RoleId>,
    pub permissions: Permissions,
    /// Voice channel the member is currently connected to.
    pub voice_channel: Option<ChannelId>,
    /// What the bot may do in that voice channel.
    pub bot_voice_permissions: Permissions,
}

/// Per-guild policy deciding who may control playback.
#[derive(Debug, Clone, PartialEq)]
pub struct GuildDjSettings {
    pub guild_id: GuildId,
    pub enabled: bool,
    pub required_permissions: Permissions,
    pub allowed_roles: Vec<RoleId>,
    pub allowed_users: Vec<UserId>,
    deleted: bool,
}

impl GuildDjSettings {
    /// Disabled policy with empty allow-lists.
    pub fn new(guild_id: GuildId) -> Self {
        Self {
            guild_id,
            enabled: false,
            required_permissions: Permissions::empty(),
            allowed_roles: Vec::new(),
            allowed_users: Vec::new(),
            deleted: false,
        }
    }

    /// Inserts a default row for `guild_id` unless one already exists.
    pub fn create_if_not_exists(db: &Database, guild_id: GuildId) -> Result<Self, DbError> {
        if let Some(existing) = db.find_dj_settings(guild_id)? {
            return Ok(existing);
        }

        let settings = Self::new(guild_id);
        settings.update(db)?;
        Ok(settings)
    }

    /// Whether `candidate` may control the queue.
    ///
    /// The member always has to be in a voice channel the bot holds
    /// `required_bot_permissions` in, and in the bot's one when the bot is
    /// connected. A disabled policy lets everyone else through. Otherwise the member needs every required permission and has
    /// to be an allowed user or hold an allowed role; with both allow-lists
    /// empty the permission check alone decides.
    pub fn is_dj_member(
        &self,
        candidate: &DjCandidate,
        bot_voice_channel: Option<ChannelId>,
        required_bot_permissions: Permissions,
    ) -> bool {
        if !self.is_in_valid_voice_channel(candidate, bot_voice_channel, required_bot_permissions) {
            return false;
        }
        if !self.enabled {
            return true;
        }
        if !self.is_permitted(candidate.permissions) {
            return false;
        }
        if self.allowed_users.is_empty() && self.allowed_roles.is_empty() {
            return true;
        }

        self.is_allowed_user(candidate.user_id)
            || candidate.roles.iter().any(|role| self.is_allowed_role(*role))
    }

    pub fn is_in_valid_voice_channel(
        &self,
        candidate: &DjCandidate,
        bot_voice_channel: Option<ChannelId>,
        required_bot_permissions: Permissions,
    ) -> bool {
        let same_channel = match (candidate.voice_channel, bot_voice_channel) {
            (None, _) => false,
            (Some(member_channel), Some(bot_channel)) => member_channel == bot_channel,
            (Some(_), None) => true,
        };
        same_channel && candidate.bot_voice_permissions.contains(required_bot_permissions)
    }

    /// Administrators hold every permission.
    pub fn is_permitted(&self, permissions: Permissions) -> bool {
        !self.enabled
            || permissions.administrator()
            || permissions.contains(self.required_permissions)
    }

    pub fn is_allowed_user(&self, user_id: UserId) -> bool {
        !self.enabled || self.allowed_users.contains(&user_id)
    }

    pub fn is_allowed_role(&self, role_id: RoleId) -> bool {
        !self.enabled || self.allowed_roles.contains(&role_id)
    }

    /// Adds the role, or removes it when already allowed. Returns whether it is now allowed.
    pub fn toggle_role(&mut self, role_id: RoleId) -> bool {
        toggle(&mut self.allowed_roles, role_id)
    }

    /// Adds the user, or removes them when already allowed. Returns whether they are now allowed.
    pub fn toggle_user(&mut self, user_id: UserId) -> bool {
        toggle(&mut self.allowed_users, user_id)
    }
}

fn toggle<T: PartialEq>(list: &mut Vec<T>, value: T) -> bool {
    if let Some(index) = list.iter().position(|existing| *existing == value) {
        list.remove(index);
        false
    } else {
        list.push(value);
        true
    }
}

impl Record for GuildDjSettings {
    fn fetch(&mut self, db: &Database) -> Result<(), DbError> {
        match db.find_dj_settings(self.guild_id)? {
            Some(fresh) => *self = fresh,
            None => self.deleted = true,
        }
        Ok(())
    }

    fn update(&self, db: &Database) -> Result<(), DbError> {
        db.upsert_dj_settings(self)
    }

    fn delete(&mut self, db: &Database) -> Result<(), DbError> {
        db.delete_dj_settings(self.guild_id)?;
        self.deleted = true;
        Ok(())
    }

    fn is_deleted(&self) -> bool {
        self.deleted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};

    const VOICE: ChannelId = ChannelId::new(100);
    const OTHER_VOICE: ChannelId = ChannelId::new(200);
    const DJ_ROLE: RoleId = RoleId::new(7);
    const BOT_NEEDS: Permissions = Permissions::CONNECT.union(Permissions::SPEAK);

    #[fixture]
    fn enabled() -> GuildDjSettings {
        let mut settings = GuildDjSettings::new(GuildId::new(1));
        settings.enabled = true;
        settings
    }

    fn member(voice_channel: Option<ChannelId>) -> DjCandidate {
        DjCandidate {
            user_id: UserId::new(55),
            roles: vec![RoleId::new(3)],
            permissions: Permissions::CONNECT | Permissions::SPEAK,
            voice_channel,
            bot_voice_permissions: BOT_NEEDS,
        }
    }

    #[rstest]
    #[case(None, None, false)]
    #[case(Some(VOICE), None, true)]
    #[case(Some(VOICE), Some(VOICE), true)]
    #[case(Some(VOICE), Some(OTHER_VOICE), false)]
    fn test_voice_channel_is_checked_even_when_disabled(
        #[case] member_channel: Option<ChannelId>,
        #[case] bot_channel: Option<ChannelId>,
        #[case] expected: bool,
    ) {
        let settings = GuildDjSettings::new(GuildId::new(1));
        assert_eq!(settings.is_dj_member(&member(member_channel), bot_channel, BOT_NEEDS), expected);
    }

    #[rstest]
    #[case::disabled(false)]
    #[case::enabled(true)]
    fn test_bot_needs_voice_permissions_in_member_channel(#[case] policy_enabled: bool) {
        let mut settings = GuildDjSettings::new(GuildId::new(1));
        settings.enabled = policy_enabled;
        let mut candidate = member(Some(VOICE));
        candidate.bot_voice_permissions = Permissions::CONNECT;

        assert!(!settings.is_dj_member(&candidate, None, BOT_NEEDS));
        assert!(!settings.is_dj_member(&candidate, Some(VOICE), BOT_NEEDS));

        candidate.bot_voice_permissions = Permissions::ADMINISTRATOR | BOT_NEEDS;
        assert!(settings.is_dj_member(&candidate, Some(VOICE), BOT_NEEDS));
    }

    #[rstest]
    fn test_enabled_with_empty_lists_only_checks_permissions(mut enabled: GuildDjSettings) {
        let candidate = member(Some(VOICE));
        assert!(enabled.is_dj_member(&candidate, Some(VOICE), BOT_NEEDS));

        enabled.required_permissions = Permissions::MANAGE_CHANNELS;
        assert!(!enabled.is_dj_member(&candidate, Some(VOICE), BOT_NEEDS));
    }

    #[rstest]
    fn test_administrator_implies_required_permissions(mut enabled: GuildDjSettings) {
        enabled.required_permissions = Permissions::MANAGE_CHANNELS | Permissions::MOVE_MEMBERS;
        let mut candidate = member(Some(VOICE));
        candidate.permissions = Permissions::ADMINISTRATOR;
        assert!(enabled.is_dj_member(&candidate, None, BOT_NEEDS));
    }

    #[rstest]
    fn test_allowed_role_or_user(mut enabled: GuildDjSettings) {
        enabled.allowed_roles = vec![DJ_ROLE];
        let mut candidate = member(Some(VOICE));
        assert!(!enabled.is_dj_member(&candidate, None, BOT_NEEDS));

        candidate.roles.push(DJ_ROLE);
        assert!(enabled.is_dj_member(&candidate, None, BOT_NEEDS));

        candidate.roles.clear();
        enabled.allowed_users = vec![candidate.user_id];
        assert!(enabled.is_dj_member(&candidate, None, BOT_NEEDS));
    }

    #[rstest]
    fn test_allowed_role_still_needs_permissions(mut enabled: GuildDjSettings) {
        enabled.allowed_roles = vec![DJ_ROLE];
        enabled.required_permissions = Permissions::MUTE_MEMBERS;
        let mut candidate = member(Some(VOICE));
        candidate.roles.push(DJ_ROLE);
        assert!(!enabled.is_dj_member(&candidate, None, BOT_NEEDS));
    }

    #[test]
    fn test_toggle_role() {
        let mut settings = GuildDjSettings::new(GuildId::new(1));
        assert!(settings.toggle_role(DJ_ROLE));
        assert_eq!(settings.allowed_roles, vec![DJ_ROLE]);
        assert!(!settings.toggle_role(DJ_ROLE));
        assert!(settings.allowed_roles.is_empty());
    }

    #[test]
    fn test_create_if_not_exists_keeps_existing_row() {
        let db = Database::open_in_memory().unwrap();
        let guild_id = GuildId::new(9);

        let mut created = GuildDjSettings::create_if_not_exists(&db, guild_id).unwrap();
        assert!(!created.enabled);

        created.enabled = true;
        created.update(&db).unwrap();

        let again = GuildDjSettings::create_if_not_exists(&db, guild_id).unwrap();
        assert!(again.enabled);
    }

    #[test]
    fn test_fetch_missing_row_marks_deleted() {
        let db = Database::open_in_memory().unwrap();
        let mut settings = GuildDjSettings::new(GuildId::new(2));
        settings.fetch(&db).unwrap();
        assert!(settings.is_deleted());
    }
}
