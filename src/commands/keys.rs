// SSH key commands: add-key, remove-key and list-keys.

use super::Command;
use crate::context::Context;
use crate::error::Result;
use crate::keys::reconcile;
use crate::ui;
use chrono::Local;
use clap::{value_parser, Arg, ArgMatches};
use std::path::PathBuf;

pub fn add_key() -> Command {
    Command {
        name: "add-key",
        usage: "add an ssh key to your account",
        flags: Some(add_key_flags),
        run: run_add_key,
    }
}

pub fn remove_key() -> Command {
    Command {
        name: "remove-key",
        usage: "disassociate an ssh key",
        flags: None,
        run: run_remove_key,
    }
}

pub fn list_keys() -> Command {
    Command {
        name: "list-keys",
        usage: "list added ssh keys",
        flags: None,
        run: run_list_keys,
    }
}

fn add_key_flags() -> clap::Command {
    clap::Command::new("add-key").arg(
        Arg::new("key-path")
            .long("key-path")
            .value_name("PATH")
            .value_parser(value_parser!(PathBuf))
            .help("path to an ssh-key to upload"),
    )
}

fn run_add_key(ctx: &mut Context, flags: &ArgMatches) -> Result<()> {
    let registered = reconcile::registered_fingerprints(ctx.api.as_mut());
    let key_path = flags.get_one::<PathBuf>("key-path");

    let key = reconcile::select_key_to_upload(
        ctx.keys.as_mut(),
        ctx.prompter.as_mut(),
        key_path.map(PathBuf::as_path),
        &registered,
    )?;

    let answer = ctx.prompter.text("Name this key [optional]")?;
    let name = reconcile::key_name(&answer, Local::now().date_naive());

    ctx.api.upload_key(&name, key.authorized.trim())?;
    println!("Added key '{}'.", name);
    Ok(())
}

fn run_list_keys(ctx: &mut Context, _: &ArgMatches) -> Result<()> {
    for key in ctx.api.list_keys()? {
        println!("{:<20}  {}  {}", key.name, key.fingerprint, key.preview);
    }
    Ok(())
}

fn run_remove_key(ctx: &mut Context, _: &ArgMatches) -> Result<()> {
    let mut keys = ctx.api.list_keys()?;
    if keys.is_empty() {
        println!("No keys registered.");
        return Ok(());
    }

    let rows: Vec<String> = keys
        .iter()
        .map(|k| format!("{:<20} {}", k.name, k.preview))
        .collect();
    let choice = ui::pick(ctx.prompter.as_mut(), "key", &rows)?;

    let chosen = keys.swap_remove(choice);
    ctx.api.delete_key(&chosen.fingerprint)?;
    println!("Removed key {}", chosen.preview);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::FakeApi;
    use crate::api::RegisteredKey;
    use crate::context::testing::{context, RecordingAuthorizer};
    use crate::error::Error;
    use crate::keys::inventory::testing::*;
    use crate::ui::testing::ScriptedPrompter;

    fn no_flags() -> ArgMatches {
        add_key().parse_flags(&[]).expect("empty flags parse")
    }

    fn registered(name: &str, text: &str) -> RegisteredKey {
        let key = key(text);
        RegisteredKey {
            name: name.into(),
            fingerprint: key.fingerprint,
            preview: key.comment,
        }
    }

    #[test]
    fn uploads_chosen_key_under_given_name() {
        let api = FakeApi::with_keys(vec![registered("old", KEY_A)]);
        let calls = api.calls.clone();
        let mut ctx = context(
            api,
            RecordingAuthorizer::default(),
            ScriptedPrompter::new(&[], &["2", "work laptop"]),
            MemoryInventory::with_keys(&[KEY_A, KEY_B, KEY_C]),
        );

        run_add_key(&mut ctx, &no_flags()).unwrap();
        assert_eq!(
            calls.borrow().uploads,
            vec![("work laptop".to_string(), KEY_C.to_string())]
        );
    }

    #[test]
    fn blank_name_uploads_under_todays_date() {
        let api = FakeApi::default();
        let calls = api.calls.clone();
        let mut ctx = context(
            api,
            RecordingAuthorizer::default(),
            ScriptedPrompter::new(&[], &[""]),
            MemoryInventory::with_keys(&[KEY_B]),
        );

        run_add_key(&mut ctx, &no_flags()).unwrap();
        let today = Local::now().date_naive().format("%Y-%m-%d").to_string();
        assert_eq!(calls.borrow().uploads, vec![(today, KEY_B.to_string())]);
    }

    #[test]
    fn nothing_uploaded_when_user_declines_creation() {
        let api = FakeApi::with_keys(vec![registered("laptop", KEY_A)]);
        let calls = api.calls.clone();
        let mut ctx = context(
            api,
            RecordingAuthorizer::default(),
            ScriptedPrompter::new(&[false], &[]),
            MemoryInventory::with_keys(&[KEY_A]),
        );

        let err = run_add_key(&mut ctx, &no_flags()).unwrap_err();
        assert_eq!(err.to_string(), "No SSH keys to add.");
        assert!(calls.borrow().uploads.is_empty());
    }

    #[test]
    fn bad_key_choice_uploads_nothing() {
        for answer in ["0", "3", "abc"] {
            let api = FakeApi::default();
            let calls = api.calls.clone();
            let mut ctx = context(
                api,
                RecordingAuthorizer::default(),
                ScriptedPrompter::new(&[], &[answer]),
                MemoryInventory::with_keys(&[KEY_A, KEY_B]),
            );

            let err = run_add_key(&mut ctx, &no_flags()).unwrap_err();
            assert!(matches!(err, Error::InvalidChoice { max: 2, .. }));
            assert!(calls.borrow().uploads.is_empty());
        }
    }

    #[test]
    fn key_path_flag_uploads_that_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deploy.pub");
        std::fs::write(&path, format!("{}\n", KEY_C)).unwrap();

        let api = FakeApi::default();
        let calls = api.calls.clone();
        let mut ctx = context(
            api,
            RecordingAuthorizer::default(),
            ScriptedPrompter::new(&[], &["deploy"]),
            MemoryInventory::with_keys(&[KEY_A, KEY_B]),
        );
        let flags = add_key()
            .parse_flags(&["--key-path".to_string(), path.display().to_string()])
            .unwrap();

        run_add_key(&mut ctx, &flags).unwrap();
        assert_eq!(
            calls.borrow().uploads,
            vec![("deploy".to_string(), KEY_C.to_string())]
        );
    }

    #[test]
    fn remove_deletes_chosen_fingerprint() {
        let keys = vec![registered("laptop", KEY_A), registered("desktop", KEY_B)];
        let target = keys[1].fingerprint.clone();
        let api = FakeApi::with_keys(keys);
        let calls = api.calls.clone();
        let mut ctx = context(
            api,
            RecordingAuthorizer::default(),
            ScriptedPrompter::new(&[], &["2"]),
            MemoryInventory::default(),
        );

        run_remove_key(&mut ctx, &ArgMatches::default()).unwrap();
        assert_eq!(calls.borrow().deletes, vec![target]);
    }

    #[test]
    fn remove_with_bad_choice_deletes_nothing() {
        for answer in ["0", "3", "x"] {
            let api = FakeApi::with_keys(vec![
                registered("laptop", KEY_A),
                registered("desktop", KEY_B),
            ]);
            let calls = api.calls.clone();
            let mut ctx = context(
                api,
                RecordingAuthorizer::default(),
                ScriptedPrompter::new(&[], &[answer]),
                MemoryInventory::default(),
            );

            let err = run_remove_key(&mut ctx, &ArgMatches::default()).unwrap_err();
            assert!(matches!(err, Error::InvalidChoice { max: 2, .. }));
            assert!(calls.borrow().deletes.is_empty());
        }
    }

    #[test]
    fn remove_with_no_keys_is_a_no_op() {
        let api = FakeApi::default();
        let calls = api.calls.clone();
        let mut ctx = context(
            api,
            RecordingAuthorizer::default(),
            ScriptedPrompter::default(),
            MemoryInventory::default(),
        );
        run_remove_key(&mut ctx, &ArgMatches::default()).unwrap();
        assert!(calls.borrow().deletes.is_empty());
    }

    #[test]
    fn list_propagates_api_failure() {
        let mut api = FakeApi::default();
        api.list_failures.push_back(Error::Api {
            status: 401,
            message: "expired".into(),
        });
        let mut ctx = context(
            api,
            RecordingAuthorizer::default(),
            ScriptedPrompter::default(),
            MemoryInventory::default(),
        );
        let err = run_list_keys(&mut ctx, &ArgMatches::default()).unwrap_err();
        assert!(matches!(err, Error::Api { status: 401, .. }));
    }
}
