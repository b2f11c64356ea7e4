use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::archive::{sync_conversation, sync_usernames};
use crate::error::Result;
use crate::history::HistoryIter;
use crate::load_token;
use crate::slack::{self, ApiClient, Conversation};
use crate::Cli;

const USERS_FILE: &str = "users.json";
const PUBLIC_CHANNELS_DIR: &str = "channels";
const PRIVATE_CHANNELS_DIR: &str = "private_channels";
const DIRECT_MESSAGES_DIR: &str = "direct_messages";

/// Run one full backup pass: user directory first (author resolution depends
/// on it), then public channels, private channels, and direct messages.
pub fn run_backup(cli: Cli) -> Result<()> {
    let token = load_token(cli.token)?;
    let api = ApiClient::new(&token)?;

    let users_path = cli.outdir.join(USERS_FILE);
    println!("Saving username list to {}", users_path.display());
    let users = api.list_users()?;
    sync_usernames(&users_path, users.clone())?;

    let channels_dir = cli.outdir.join(PUBLIC_CHANNELS_DIR);
    println!("Saving public channels to {}", channels_dir.display());
    let channels = slack::member_channels(api.list_channels()?);
    backup_conversations(&api, &users, &channels, &channels_dir);

    let private_dir = cli.outdir.join(PRIVATE_CHANNELS_DIR);
    println!("Saving private channels to {}", private_dir.display());
    let groups = slack::named_channels(api.list_groups()?);
    backup_conversations(&api, &users, &groups, &private_dir);

    let dm_dir = cli.outdir.join(DIRECT_MESSAGES_DIR);
    println!("Saving direct messages to {}", dm_dir.display());
    let threads = slack::dm_threads(api.list_dm_threads()?, &users)?;
    backup_conversations(&api, &users, &threads, &dm_dir);

    Ok(())
}

/// Sync every conversation against its own snapshot file. A fetch failure
/// aborts only that conversation and leaves its prior snapshot untouched;
/// the remaining conversations are still processed.
fn backup_conversations(
    api: &ApiClient,
    users: &BTreeMap<String, String>,
    conversations: &[Conversation],
    dir: &Path,
) {
    for conversation in conversations {
        let path = snapshot_path(dir, &conversation.name);
        let source = HistoryIter::new(api.history_pager(&conversation.id), users);
        match sync_conversation(&path, &conversation.info, source) {
            Ok(new_messages) => {
                println!("  #{}: {} new messages", conversation.name, new_messages)
            }
            Err(err) => eprintln!("  #{}: sync failed: {}", conversation.name, err),
        }
    }
}

fn snapshot_path(dir: &Path, name: &str) -> PathBuf {
    dir.join(format!("{name}.json"))
}
