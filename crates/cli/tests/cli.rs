use assert_cmd::Command;

fn shelf(config_dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("shelf").unwrap();
    cmd.env("SHELF_CONFIG_DIR", config_dir)
        .env("RUST_LOG", "warn")
        .env_remove("SHELF_ENV")
        .env_remove("PORT")
        .env_remove("DATABASE_URL")
        .env_remove("REVIEW_SERVICE_URL");
    cmd
}

fn scratch_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("shelf-cli-{name}-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn config_prints_effective_settings() {
    let dir = scratch_dir("config");
    std::fs::write(dir.join("base.toml"), "[reviews]\nbase_url = \"http://reviews:9000\"\n").unwrap();

    let assert = shelf(&dir).arg("config").assert().success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).unwrap();
    let printed: serde_json::Value = serde_json::from_str(&stdout).unwrap();

    assert_eq!(printed["server"]["port"], 5000);
    assert_eq!(printed["reviews"]["base_url"], "http://reviews:9000");

    std::fs::remove_dir_all(&dir).ok();
}

#[test]
fn unknown_environment_fails() {
    let dir = scratch_dir("env");
    shelf(&dir).env("SHELF_ENV", "qa").arg("config").assert().failure();
    std::fs::remove_dir_all(&dir).ok();
}

async fn book_count(url: &str) -> i64 {
    let pool = shelf_db::connect(url, 1).await.unwrap();
    let count = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(&pool)
        .await
        .unwrap();
    pool.close().await;
    count
}

#[tokio::test]
async fn migrate_and_seed_create_a_catalog() {
    let dir = scratch_dir("seed");
    let url = format!("sqlite://{}", dir.join("books.db").display());

    shelf(&dir).env("DATABASE_URL", &url).arg("migrate").assert().success();
    assert_eq!(book_count(&url).await, 0);

    shelf(&dir).env("DATABASE_URL", &url).arg("seed").assert().success();
    assert_eq!(book_count(&url).await, 5);

    // Second run finds the catalog populated and leaves it alone.
    shelf(&dir).env("DATABASE_URL", &url).arg("seed").assert().success();
    assert_eq!(book_count(&url).await, 5);

    std::fs::remove_dir_all(&dir).ok();
}
