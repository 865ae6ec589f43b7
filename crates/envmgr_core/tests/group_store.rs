use envmgr_core::{Group, GroupItem, GroupStore, LoadStatus, Scope, StoreError, Variable};
use std::fs;

fn dev_group() -> Group {
    Group::new("dev")
        .with_item(
            GroupItem::new("staging")
                .with_variable(Variable::new("API_URL", "staging.example.com", Scope::User)),
        )
        .with_item(
            GroupItem::new("prod")
                .with_variable(Variable::new("API_URL", "prod.example.com", Scope::User)),
        )
}

#[test]
fn get_unknown_group_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let store = GroupStore::open(dir.path().join("env_group.json"));

    let err = store.get("missing").unwrap_err();
    assert!(matches!(err, StoreError::GroupNotFound(name) if name == "missing"));
    assert!(store.get("missing").unwrap_err().is_not_found());
}

#[test]
fn delete_unknown_group_is_noop_success() {
    let dir = tempfile::tempdir().unwrap();
    let store = GroupStore::open(dir.path().join("env_group.json"));
    store.set(dev_group()).unwrap();

    store.delete("missing").unwrap();
    assert_eq!(store.get_all().len(), 1);

    store.delete("dev").unwrap();
    store.delete("dev").unwrap();
    assert!(store.get_all().is_empty());
}

#[test]
fn groups_survive_reopen_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("env_group.json");
    let store = GroupStore::open(&path);
    store.set(Group::new("zeta")).unwrap();
    store.set(dev_group()).unwrap();
    store.set(Group::new("alpha")).unwrap();
    let before = store.get_all();
    drop(store);

    let reopened = GroupStore::open(&path);
    assert_eq!(reopened.load_status(), &LoadStatus::Loaded(3));
    assert_eq!(reopened.get_all(), before);
    let names: Vec<_> = before.iter().map(|group| group.name.as_str()).collect();
    assert_eq!(names, ["zeta", "dev", "alpha"]);
}

#[test]
fn persisted_layout_matches_item_and_env_lists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("env_group.json");
    let store = GroupStore::open(&path);
    store.set(dev_group()).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let item = &json[0]["itemList"][1];
    assert_eq!(item["name"], "prod");
    assert_eq!(item["selected"], false);
    assert_eq!(
        item["envList"][0],
        serde_json::json!({
            "name": "API_URL",
            "value": "prod.example.com",
            "source": "user",
            "remark": ""
        })
    );
}

#[test]
fn snapshot_mutation_does_not_leak_into_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = GroupStore::open(dir.path().join("env_group.json"));
    store.set(dev_group()).unwrap();

    let mut snapshot = store.get_all();
    snapshot[0].items.clear();
    assert_eq!(store.get("dev").unwrap().items.len(), 2);
}

#[test]
fn malformed_group_file_recovers_to_empty() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("env_group.json");
    fs::write(&path, "null").unwrap();

    let store = GroupStore::open(&path);
    assert!(store.load_status().is_recovered());
    assert!(store.get_all().is_empty());
}
