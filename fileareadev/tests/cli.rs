use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::TempDir;

fn fileareadev(data: &Path, args: &[&str]) -> Output {
    let out = Command::new(env!("CARGO_BIN_EXE_fileareadev"))
        .arg("--data-dir")
        .arg(data)
        .args(args)
        .output()
        .unwrap();
    assert!(
        out.status.success(),
        "fileareadev {args:?} failed: {}",
        String::from_utf8_lossy(&out.stderr)
    );
    out
}

fn stdout(out: &Output) -> String {
    String::from_utf8(out.stdout.clone()).unwrap()
}

fn blob_count(data: &Path) -> usize {
    walkdir::WalkDir::new(data.join("blobs"))
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .count()
}

#[test]
fn draft_edit_save_and_serve() {
    let work = TempDir::new().unwrap();
    let data = work.path().join("store");
    let src = work.path().join("hello.txt");
    fs::write(&src, "hello file areas").unwrap();

    let out = fileareadev(&data, &["draft", "new", "7"]);
    let draft = stdout(&out).lines().next().unwrap().trim().to_string();
    assert!(draft.parse::<i64>().unwrap() > 0);

    fileareadev(
        &data,
        &["draft", "add", "7", &draft, src.to_str().unwrap(), "--path", "/docs/"],
    );
    let listing = stdout(&fileareadev(&data, &["draft", "ls", "7", &draft]));
    assert!(listing.contains(&format!(
        "/docs/hello.txt\thttp://localhost/draftfile.php/7/draft/{draft}/docs/hello.txt"
    )));

    fileareadev(&data, &["draft", "save", "7", &draft, "5/intro/0"]);
    let area = stdout(&fileareadev(&data, &["area", "ls", "5/intro/0"]));
    let paths: Vec<&str> = area.lines().collect();
    assert_eq!(paths, ["/", "/docs/", "/docs/hello.txt"]);

    // the draft is gone once saved
    assert!(stdout(&fileareadev(&data, &["draft", "ls", "7", &draft])).is_empty());

    let resp = fileareadev(
        &data,
        &["cat", "5/intro/0", "/docs/hello.txt", "--range", "bytes=6-9"],
    );
    let text = stdout(&resp);
    assert!(text.starts_with("HTTP/1.1 206 Partial Content\r\n"));
    assert!(text.contains("Content-Range: bytes 6-9/16\r\n"));
    assert!(text.ends_with("\r\n\r\nfile"));
}

#[test]
fn put_directory_and_remove() {
    let work = TempDir::new().unwrap();
    let data = work.path().join("store");
    let tree = work.path().join("site");
    fs::create_dir_all(tree.join("img")).unwrap();
    fs::write(tree.join("index.html"), "<p>same</p>").unwrap();
    fs::write(tree.join("img").join("copy.html"), "<p>same</p>").unwrap();

    fileareadev(&data, &["area", "put", "3/content/1", tree.to_str().unwrap()]);
    let area = stdout(&fileareadev(&data, &["area", "ls", "3/content/1"]));
    assert!(area.lines().any(|l| l == "/img/copy.html"));
    assert!(area.lines().any(|l| l == "/index.html"));
    // identical content is stored once
    assert_eq!(blob_count(&data), 1);

    fileareadev(&data, &["area", "rm", "3/content/1", "/img/"]);
    let area = stdout(&fileareadev(&data, &["area", "ls", "3/content/1"]));
    assert_eq!(area.lines().collect::<Vec<_>>(), ["/", "/index.html"]);

    fileareadev(&data, &["compact"]);
    let area = stdout(&fileareadev(&data, &["area", "ls", "3/content/1"]));
    assert_eq!(area.lines().count(), 2);
}

#[test]
fn builds_urls_and_rewrites_placeholders() {
    let work = TempDir::new().unwrap();
    let data = work.path().join("store");

    let url = stdout(&fileareadev(
        &data,
        &[
            "--wwwroot",
            "https://lms.example.org",
            "url",
            "build",
            "5",
            "intro",
            "/a b.pdf",
            "--item",
            "0",
            "--force-download",
        ],
    ));
    assert_eq!(
        url.trim(),
        "https://lms.example.org/pluginfile.php/5/intro/0/a%20b.pdf?forcedownload=1"
    );

    let folded = stdout(&fileareadev(
        &data,
        &[
            "url",
            "to-placeholder",
            "<img src=\"http://localhost/pluginfile.php/5/intro/0/x.png\">",
            "5",
            "intro",
            "--item",
            "0",
        ],
    ));
    assert_eq!(folded.trim(), "<img src=\"@@PLUGINFILE@@/x.png\">");

    let expanded = stdout(&fileareadev(
        &data,
        &["url", "from-placeholder", folded.trim(), "5", "intro", "--item", "0"],
    ));
    assert_eq!(
        expanded.trim(),
        "<img src=\"http://localhost/pluginfile.php/5/intro/0/x.png\">"
    );
}
