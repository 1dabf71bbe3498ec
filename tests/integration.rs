//! Integration tests: whole passes over export trees written to temp dirs.

use std::fs;
use std::path::Path;

use chatarchive::prelude::*;
use chrono::{TimeZone, Utc};
use serde_json::Value;
use tempfile::{TempDir, tempdir};

// ============================================================================
// Helpers
// ============================================================================

fn write(root: &Path, rel: &str, content: impl AsRef<[u8]>) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn messages(format: SourceFormat, options: SourceOptions) -> (RunStats, Vec<Message>) {
    let adapter = create_adapter(format, options).unwrap();
    let mut buf = Vec::new();
    let stats = run_messages(adapter.as_ref(), &mut buf).unwrap();
    let parsed = String::from_utf8(buf)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    (stats, parsed)
}

fn contacts(format: SourceFormat, options: SourceOptions) -> (RunStats, Value) {
    let adapter = create_adapter(format, options).unwrap();
    let mut buf = Vec::new();
    let stats = run_contacts(adapter.as_ref(), &mut buf).unwrap();
    (stats, serde_json::from_slice(&buf).unwrap())
}

// ============================================================================
// Trillian
// ============================================================================

const TRILLIAN_ALICE: &str = "\
Session Start (ICQ - 000002:Alice): Thu Jan 24 21:54:39 2002
Alice: Hi Bob
Bob: Hi Alice.
What a nice day!
Alice: Indeed
Session Close (Alice): Thu Jan 24 23:05:59 2002

Session Start (ICQ - 000002:Alice): Fri Jan 25 08:00:00 2002
Bob: morning
Session Close (Alice): Fri Jan 25 08:10:00 2002
";

const TRILLIAN_CAROL: &str = "\
Session Start (MSN - carol@hotmail.com:Carol C): Sat Feb 02 10:00:00 2002
Carol C: ping
Session Close (Carol C): Sat Feb 02 10:01:00 2002
";

fn trillian_tree() -> TempDir {
    let dir = tempdir().unwrap();
    write(dir.path(), "ICQ/000002.log", TRILLIAN_ALICE);
    write(dir.path(), "MSN/carol@hotmail.com.log", TRILLIAN_CAROL);
    write(dir.path(), "Unknown/noise.log", "Session Start (XYZ - 1:x): garbage");
    dir
}

#[test]
fn test_trillian_messages() {
    let dir = trillian_tree();
    let options = SourceOptions::new().with_root(dir.path()).with_owner("000001");
    let (stats, msgs) = messages(SourceFormat::Trillian, options);

    assert_eq!(stats.emitted, 5);
    assert_eq!(stats.failures, 0);

    let t0 = Utc.with_ymd_and_hms(2002, 1, 24, 21, 54, 39).unwrap();
    assert_eq!(msgs[0].from, "000002");
    assert_eq!(msgs[0].to, MessageTarget::user("000001"));
    assert_eq!(msgs[0].ts, t0);

    assert_eq!(msgs[1].from, "000001");
    assert_eq!(msgs[1].text, "Hi Alice.\nWhat a nice day!");
    assert_eq!(msgs[1].ts, t0 + chrono::Duration::seconds(5));
    assert_eq!(msgs[2].ts, t0 + chrono::Duration::seconds(10));

    // the second session restarts the index
    assert_eq!(msgs[3].ts, Utc.with_ymd_and_hms(2002, 1, 25, 8, 0, 0).unwrap());

    assert_eq!(msgs[4].platform, Platform::Msn);
    assert_eq!(msgs[4].from, "carol@hotmail.com");
}

#[test]
fn test_trillian_contacts_are_deduplicated() {
    let dir = trillian_tree();
    let (stats, json) = contacts(SourceFormat::Trillian, SourceOptions::new().with_root(dir.path()));

    assert_eq!(stats.seen, 3);
    assert_eq!(stats.emitted, 2);
    assert_eq!(json[0]["name"], "Alice");
    assert_eq!(json[0]["platform_ids"][0]["id"], "000002");
    assert_eq!(json[0]["platform_ids"][0]["platform"], "icq");
    assert_eq!(json[1]["name"], "Carol C");
    assert_eq!(json[1]["platform_ids"][0]["platform"], "msn");
}

#[test]
fn test_trillian_without_owner_fails() {
    let dir = trillian_tree();
    let adapter = create_adapter(SourceFormat::Trillian, SourceOptions::new().with_root(dir.path())).unwrap();
    let err = run_messages(adapter.as_ref(), Vec::new()).unwrap_err();
    assert!(err.is_unresolved());
}

// ============================================================================
// SMS
// ============================================================================

#[test]
fn test_sms_directory() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "2003/inbox.txt",
        "Received SMS.\nId: 1\nDate: 29.12.2003 г. 21:40:05\nNumbers: 0888123456\nSee you\n---\n",
    );
    write(dir.path(), "export.csv", "Date;Number;Text\n2009-03-01 18:13:51;+359888000111;csv hello\n");
    write(
        dir.path(),
        "phone.xml",
        "<!DOCTYPE MESSAGES>\n<MESSAGES><MESSAGE><TELNUM>0888999</TELNUM><DATE>01.02.2010 10:00:00</DATE><TEXT>xml hi</TEXT></MESSAGE></MESSAGES>",
    );

    let options = SourceOptions::new().with_root(dir.path()).with_owner("0888000000");
    let (stats, msgs) = messages(SourceFormat::Sms, options);

    assert_eq!(stats.emitted, 3);
    let texts: Vec<_> = msgs.iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, ["See you", "csv hello", "xml hi"]);
    assert!(msgs.iter().all(|m| m.to == MessageTarget::user("0888000000")));
    assert!(msgs.iter().all(|m| m.platform == Platform::Sms));
    assert_eq!(msgs[0].ts, Utc.with_ymd_and_hms(2003, 12, 29, 21, 40, 5).unwrap());
}

#[test]
fn test_sms_body_lines_that_look_like_labels() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "inbox.txt",
        "Received SMS.\nId: 1\nDate: 29.12.2003 21:40:05\nNumbers: 0888123456 <Ivan>\n\
         Date: whenever suits you\nNumbers: 0777 or 0666\n---\n\
         Received SMS.\nId: 2\nDate: 29.12.2003 21:45:00\nNumbers: 0777\nok\n---\n",
    );

    let options = SourceOptions::new().with_root(dir.path()).with_owner("me");
    let (stats, msgs) = messages(SourceFormat::Sms, options);

    assert_eq!(stats.failures, 0);
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].from, "0888123456");
    assert_eq!(msgs[0].text, "Date: whenever suits you\nNumbers: 0777 or 0666");
    assert_eq!(msgs[1].from, "0777");
    assert_eq!(msgs[1].ts, Utc.with_ymd_and_hms(2003, 12, 29, 21, 45, 0).unwrap());
}

#[test]
fn test_sms_phone_books_merge_duplicates() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.csv", "1;x;'0888123456;'Ivan?\n2;x;'0888777777;Maria\n");
    write(dir.path(), "b.csv", "1;x;0888123456;Ivan Petrov\n");

    let (stats, json) = contacts(SourceFormat::Sms, SourceOptions::new().with_root(dir.path()));
    assert_eq!(stats.emitted, 2);
    assert_eq!(json[0]["name"], "Ivan");
    assert_eq!(json[0]["platform_ids"][0]["id"], "0888123456");
}

// ============================================================================
// Skype
// ============================================================================

#[test]
fn test_skype_export_with_contacts_csv() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "messages.json",
        r#"{"userId": "8:me", "conversations": [{"id": "8:alice", "displayName": "Alice", "MessageList": [
            {"originalarrivaltime": "2022-10-28T19:30:27Z", "from": "8:alice", "content": "<i>hey</i>"},
            {"originalarrivaltime": "2022-10-28T19:31:27Z", "from": "8:me", "content": "hello"}
        ]}]}"#,
    );
    write(
        dir.path(),
        "contacts.csv",
        "id,display_name,profile.skype_handle\n8:alice,Alice,alice\n8:alice,Alice dup,alice\n",
    );

    let options = SourceOptions::new()
        .with_file(dir.path().join("messages.json"))
        .with_contacts_file(dir.path().join("contacts.csv"));

    let (_, msgs) = messages(SourceFormat::Skype, options.clone());
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].text, "hey");
    assert_eq!(msgs[0].raw.as_deref(), Some("<i>hey</i>"));
    assert_eq!(msgs[0].to, MessageTarget::user("me"));
    assert_eq!(msgs[0].from, "alice");
    assert_eq!(msgs[1].to, MessageTarget::user("alice"));

    let (stats, json) = contacts(SourceFormat::Skype, options);
    assert_eq!(stats.emitted, 1);
    assert_eq!(json[0]["name"], "Alice");
}

#[test]
fn test_skypelog_dump() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "dump.jsonl",
        "{\"author\": \"alice\", \"dialog_partner\": \"bob\", \"body_xml\": \"hi\", \"timestamp\": 1700000000}\n\
         {\"author\": \"bob\", \"dialog_partner\": \"alice\", \"body_xml\": \"yo\", \"timestamp\": 1700000000000}\n",
    );
    let (_, msgs) = messages(SourceFormat::SkypeLog, SourceOptions::new().with_file(dir.path().join("dump.jsonl")));
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].ts, msgs[1].ts);
}

// ============================================================================
// Telegram, Google Chat, Kopete
// ============================================================================

#[test]
fn test_telegram_directory() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "alice.jsonl",
        r#"{"event": "message", "date": 1485941000, "text": "Ok", "from": {"peer_id": 2, "peer_type": "user", "print_name": "Bob"}, "to": {"peer_id": 1, "peer_type": "user", "print_name": "Alice"}}
{"event": "message", "date": 1485941060, "text": "Ok!", "from": {"peer_id": 1, "peer_type": "user", "print_name": "Alice"}, "to": {"peer_id": 2, "peer_type": "user", "print_name": "Bob"}}"#,
    );

    let options = SourceOptions::new().with_root(dir.path());
    let (_, msgs) = messages(SourceFormat::Telegram, options.clone());
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[1].from, "1");

    let (stats, json) = contacts(SourceFormat::Telegram, options);
    assert_eq!(stats.seen, 4);
    assert_eq!(stats.emitted, 2);
    assert_eq!(json[0]["name"], "Bob");
}

#[test]
fn test_google_chat_groups() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "DM abc/group_info.json",
        r#"{"members": [{"name": "Alice", "email": "alice@example.com", "user_type": "Human"}]}"#,
    );
    write(
        dir.path(),
        "DM abc/messages.json",
        r#"{"messages": [{"creator": {"name": "Alice", "email": "alice@example.com"}, "created_date": "Sunday, 1 March 2000 at 09:33:50 UTC", "text": "Hi Bob", "topic_id": "t1"}]}"#,
    );
    write(
        dir.path(),
        "Space xyz/group_info.json",
        r#"{"members": [{"name": "Alice", "email": "alice@example.com", "user_type": "Human"}]}"#,
    );

    let options = SourceOptions::new().with_root(dir.path());
    let (_, msgs) = messages(SourceFormat::GoogleChat, options.clone());
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].to, MessageTarget::group("DM abc"));
    assert_eq!(msgs[0].ts, Utc.with_ymd_and_hms(2000, 3, 1, 9, 33, 50).unwrap());

    let (stats, json) = contacts(SourceFormat::GoogleChat, options);
    assert_eq!(stats.emitted, 1);
    assert_eq!(json[0]["platform_ids"][0]["meta"]["user_type"], "Human");
}

#[test]
fn test_kopete_history_and_contacts() {
    let dir = tempdir().unwrap();
    write(
        dir.path(),
        "logs/ICQProtocol/111/222.200911.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE Kopete-History>
<kopete-history version="0.9"><head><date year="2009" month="11"/><contact contactId="111" type="myself"/><contact contactId="222"/></head>
<msg in="1" from="222" time="20 20:9:48">hello</msg><msg in="0" from="111" time="20 20:10:00">hi</msg></kopete-history>"#,
    );
    write(
        dir.path(),
        "contactlist.xml",
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE kopete-contact-list>
<kopete-contact-list><meta-contact><plugin-data plugin-id="ICQProtocol"><plugin-data-field key="accountId">222</plugin-data-field><plugin-data-field key="displayName">Friend</plugin-data-field></plugin-data></meta-contact></kopete-contact-list>"#,
    );

    let options = SourceOptions::new()
        .with_root(dir.path().join("logs"))
        .with_file(dir.path().join("contactlist.xml"));

    let (_, msgs) = messages(SourceFormat::Kopete, options.clone());
    assert_eq!(msgs.len(), 2);
    assert_eq!(msgs[0].platform, Platform::Icq);
    assert_eq!(msgs[0].to, MessageTarget::user("111"));
    assert_eq!(msgs[1].to, MessageTarget::user("222"));

    let (_, json) = contacts(SourceFormat::Kopete, options);
    assert_eq!(json[0]["name"], "Friend");
}

// ============================================================================
// Cross-cutting
// ============================================================================

#[test]
fn test_messages_pass_is_restartable() {
    let dir = trillian_tree();
    let options = SourceOptions::new().with_root(dir.path()).with_owner("000001");
    let adapter = create_adapter(SourceFormat::Trillian, options).unwrap();

    let first: Vec<_> = adapter.messages().unwrap().map(|r| r.unwrap()).collect();
    let second: Vec<_> = adapter.messages().unwrap().map(|r| r.unwrap()).collect();
    assert_eq!(first, second);
}

#[test]
fn test_one_bad_file_does_not_stop_siblings() {
    let dir = tempdir().unwrap();
    write(dir.path(), "a.jsonl", "{not json\n");
    write(
        dir.path(),
        "b.jsonl",
        r#"{"event": "message", "date": 1485941000, "text": "still here", "from": {"peer_id": 2}, "to": {"peer_id": 1}}"#,
    );
    let (stats, msgs) = messages(SourceFormat::Telegram, SourceOptions::new().with_root(dir.path()));
    assert_eq!(stats.failures, 1);
    assert_eq!(msgs.len(), 1);
    assert_eq!(msgs[0].text, "still here");
}
