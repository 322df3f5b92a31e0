use repotalk_ingest::{
    bundle_files, collect_files, parse_repo_url, Cleanup, Workspace, FILE_HEADER_PREFIX,
};
use std::fs;
use std::path::Path;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

#[test]
fn test_working_copy_to_bundle() {
    let dir = tempfile::tempdir().unwrap();
    let workspace = Workspace::new(dir.path().join("repos"), dir.path().join("bundles"));
    let repo = parse_repo_url("https://github.com/alice/bob.git").unwrap();

    let working_copy = workspace.working_copy(&repo);
    write(&working_copy, "cmd/server/main.go", "package main\n");
    write(&working_copy, "web/app.tsx", "export const App = () => null;\n");
    write(&working_copy, "docs/guide.md", "# guide\n");
    write(&working_copy, ".git/config", "[core]\n");
    write(&working_copy, "Cargo.toml", "[package]\nname = \"bob\"\n");

    let files = collect_files(&working_copy).unwrap();
    let bundle = workspace.prepare_bundle_dir(&repo).unwrap();
    let stats = bundle_files(&files, &bundle, Some(&working_copy)).unwrap();

    assert_eq!(stats.files, 3);
    assert_eq!(stats.lines, 4);

    let content = fs::read_to_string(&bundle).unwrap();
    let headers: Vec<&str> = content
        .lines()
        .filter_map(|l| l.strip_prefix(FILE_HEADER_PREFIX))
        .collect();
    assert_eq!(headers, vec!["Cargo.toml", "cmd/server/main.go", "web/app.tsx"]);
    assert!(!content.contains("# guide"));

    assert_eq!(workspace.remove_working_copy(&repo), Cleanup::Done);
    assert!(!dir.path().join("repos/alice").exists());
    assert!(workspace.has_bundle(&repo).unwrap());
}
