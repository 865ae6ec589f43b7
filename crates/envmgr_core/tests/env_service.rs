use envmgr_core::{
    CommentRecord, CommentStore, EnvMgrConfig, EnvService, EnvServiceError, GroupStore,
    MemoryBackend, ProfileStore, PropertyKey, PropertyStore, Scope, Variable, VariableBackend,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

fn service_in(dir: &Path, backend: MemoryBackend) -> EnvService<MemoryBackend> {
    EnvService::new(
        backend,
        PropertyStore::open(dir.join("env_property.json")),
        GroupStore::open(dir.join("env_group.json")),
        ProfileStore::open(dir.join("envmgr_profiles.json")),
    )
}

fn find<'a>(variables: &'a [Variable], name: &str) -> Vec<&'a Variable> {
    variables.iter().filter(|variable| variable.name == name).collect()
}

#[test]
fn merged_view_prefers_user_scope_and_attaches_scoped_remarks() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MemoryBackend::new()
        .with_variables(Scope::System, [("PATH", "/usr/bin"), ("OS", "linux")])
        .with_variables(Scope::User, [("PATH", "/home/me/bin"), ("EDITOR", "vim")]);
    let service = service_in(dir.path(), backend);
    service
        .remarks()
        .set(PropertyKey::new("PATH", Scope::System), "machine path")
        .unwrap();
    service
        .remarks()
        .set(PropertyKey::new("PATH", Scope::User), "my path")
        .unwrap();

    let merged = service.merged_variables().unwrap();
    assert_eq!(merged.len(), 3);

    let path = find(&merged, "PATH");
    assert_eq!(path.len(), 1);
    assert_eq!(path[0].scope, Scope::User);
    assert_eq!(path[0].value, "/home/me/bin");
    assert_eq!(path[0].remark, "my path");

    let os = find(&merged, "OS");
    assert_eq!(os[0].scope, Scope::System);
    assert_eq!(os[0].remark, "");
}

#[test]
fn name_keyed_remarks_apply_to_either_scope() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MemoryBackend::new().with_variables(Scope::System, [("GOROOT", "/usr/go")]);
    let service: EnvService<MemoryBackend, CommentRecord> = EnvService::new(
        backend,
        CommentStore::open(dir.path().join("envmgr_comments.json")),
        GroupStore::open(dir.path().join("env_group.json")),
        ProfileStore::open(dir.path().join("envmgr_profiles.json")),
    );
    service.set_remark(Scope::User, "GOROOT", "go install").unwrap();

    let merged = service.merged_variables().unwrap();
    assert_eq!(merged[0].remark, "go install");
}

#[test]
fn set_variable_writes_value_and_remark() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_in(dir.path(), MemoryBackend::new());

    service
        .set_variable(Scope::User, "EDITOR", "hx", "helix")
        .unwrap();
    assert_eq!(service.backend().get(Scope::User, "EDITOR").as_deref(), Some("hx"));
    assert_eq!(service.remarks().remark_for("EDITOR", Scope::User), "helix");
    assert_eq!(service.backend().broadcast_count(), 1);

    service.set_variable(Scope::User, "EDITOR", "vi", "").unwrap();
    assert_eq!(service.remarks().remark_for("EDITOR", Scope::User), "");
}

#[test]
fn system_write_without_elevation_is_permission_denied_and_metadata_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MemoryBackend::new();
    backend.set_system_writable(false);
    let service = service_in(dir.path(), backend);
    let metadata_path = dir.path().join("env_property.json");
    let before = fs::read(&metadata_path).unwrap();

    assert!(!service.is_privileged());
    let err = service
        .set_variable(Scope::System, "JAVA_HOME", "C:\\jdk", "jdk")
        .unwrap_err();
    assert!(err.is_permission_denied());
    assert!(matches!(
        err,
        EnvServiceError::PermissionDenied { scope: Scope::System, ref name } if name == "JAVA_HOME"
    ));

    assert_eq!(fs::read(&metadata_path).unwrap(), before);
    assert_eq!(service.backend().get(Scope::System, "JAVA_HOME"), None);
}

#[test]
fn backend_failure_is_not_reported_as_permission_problem() {
    let dir = tempfile::tempdir().unwrap();
    let backend = MemoryBackend::new();
    backend.fail_writes_for(Scope::User, "BROKEN");
    let service = service_in(dir.path(), backend);

    let err = service
        .set_variable(Scope::User, "BROKEN", "x", "remark")
        .unwrap_err();
    assert!(matches!(err, EnvServiceError::Backend(_)));
    assert_eq!(service.remarks().remark_for("BROKEN", Scope::User), "");
}

#[test]
fn invalid_variable_name_is_rejected_before_backend() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_in(dir.path(), MemoryBackend::new());

    let err = service
        .set_variable(Scope::User, "A=B", "x", "")
        .unwrap_err();
    assert!(matches!(err, EnvServiceError::Validation(_)));
    assert!(service.backend().list_variables(Scope::User).unwrap().is_empty());
}

#[test]
fn delete_variable_removes_value_and_remark() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_in(dir.path(), MemoryBackend::new());
    service
        .set_variable(Scope::System, "JAVA_HOME", "/opt/jdk", "jdk")
        .unwrap();

    service.delete_variable(Scope::System, "JAVA_HOME").unwrap();
    assert_eq!(service.backend().get(Scope::System, "JAVA_HOME"), None);
    assert_eq!(service.remarks().remark_for("JAVA_HOME", Scope::System), "");

    // already absent
    service.delete_variable(Scope::System, "JAVA_HOME").unwrap();
}

#[test]
fn delete_group_unknown_is_success() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_in(dir.path(), MemoryBackend::new());
    service.delete_group("nothing-here").unwrap();
    assert!(service.list_groups().is_empty());
}

#[test]
fn profile_apply_writes_user_scope_only() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_in(dir.path(), MemoryBackend::new());
    let vars = BTreeMap::from([
        ("GOPATH".to_string(), "/home/me/go".to_string()),
        ("GOFLAGS".to_string(), "-mod=mod".to_string()),
    ]);
    service.save_profile("go", vars).unwrap();

    let applied = service.apply_profile("go").unwrap();
    assert_eq!(applied, 2);
    assert_eq!(
        service.backend().get(Scope::User, "GOPATH").as_deref(),
        Some("/home/me/go")
    );
    assert!(service.backend().list_variables(Scope::System).unwrap().is_empty());
}

#[test]
fn profile_save_replaces_by_name_and_unknown_apply_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let service = service_in(dir.path(), MemoryBackend::new());
    service
        .save_profile("p", BTreeMap::from([("A".to_string(), "1".to_string())]))
        .unwrap();
    service
        .save_profile("p", BTreeMap::from([("B".to_string(), "2".to_string())]))
        .unwrap();

    let profiles = service.list_profiles();
    assert_eq!(profiles.len(), 1);
    assert!(profiles[0].vars.contains_key("B"));

    let err = service.apply_profile("missing").unwrap_err();
    assert!(matches!(err, EnvServiceError::NotFound { kind: "profile", .. }));
}

#[test]
fn file_backed_service_persists_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let config = EnvMgrConfig::from_data_dir(dir.path());

    {
        let service: EnvService<_> = EnvService::open(config.file_backend(), &config);
        service
            .set_variable(Scope::User, "EDITOR", "vim", "default editor")
            .unwrap();
        service
            .set_variable(Scope::System, "EDITOR", "nano", "")
            .unwrap();
    }

    let service: EnvService<_> = EnvService::open(config.file_backend(), &config);
    let merged = service.merged_variables().unwrap();
    assert_eq!(merged.len(), 1);
    assert_eq!(merged[0].value, "vim");
    assert_eq!(merged[0].scope, Scope::User);
    assert_eq!(merged[0].remark, "default editor");
    assert!(dir.path().join("env_changed.stamp").exists());
}

#[test]
fn remark_flush_failure_still_broadcasts_the_variable_write() {
    let dir = tempfile::tempdir().unwrap();
    // A directory at the metadata path makes every remark flush fail.
    let blocked = dir.path().join("env_property.json");
    fs::create_dir(&blocked).unwrap();
    let service = EnvService::new(
        MemoryBackend::new(),
        PropertyStore::open(&blocked),
        GroupStore::open(dir.path().join("env_group.json")),
        ProfileStore::open(dir.path().join("envmgr_profiles.json")),
    );

    let err = service
        .set_variable(Scope::User, "EDITOR", "vim", "preferred editor")
        .unwrap_err();
    assert!(matches!(err, EnvServiceError::Store(_)));
    assert_eq!(
        service.backend().get(Scope::User, "EDITOR").as_deref(),
        Some("vim")
    );
    assert_eq!(service.backend().broadcast_count(), 1);

    // Deleting with no stored remark needs no flush and succeeds.
    service.delete_variable(Scope::User, "EDITOR").unwrap();
    assert_eq!(service.backend().get(Scope::User, "EDITOR"), None);
    assert_eq!(service.backend().broadcast_count(), 2);
}
