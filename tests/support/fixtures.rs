use std::fs;
use std::path::{Path, PathBuf};

/// Create `count` empty `.png` files in `root/<class>`, returning their paths.
pub fn write_class_dir(root: &Path, class: &str, count: usize) -> Vec<PathBuf> {
    let dir = root.join(class);
    fs::create_dir_all(&dir).unwrap();
    (0..count)
        .map(|idx| {
            let path = dir.join(format!("{class}_{idx:03}.png"));
            fs::write(&path, b"").unwrap();
            path
        })
        .collect()
}

/// Write a label CSV with `file,class,label` rows next to the images.
pub fn write_label_csv(root: &Path, classes: &[(&str, usize)]) -> PathBuf {
    let mut text = String::from("file,class,label\n");
    for (class_idx, (label, count)) in classes.iter().enumerate() {
        for idx in 0..*count {
            let name = format!("{label}_{idx:03}.jpg");
            fs::write(root.join(&name), b"").unwrap();
            text.push_str(&format!("{name},{class_idx},{label}\n"));
        }
    }
    let path = root.join("labels.csv");
    fs::write(&path, text).unwrap();
    path
}

/// Write a project XML whose images are classified as the given codes.
pub fn write_project_xml(root: &Path, images: &[(&str, &str)], taxons: &[&str]) -> PathBuf {
    let images_dir = root.join("images");
    fs::create_dir_all(&images_dir).unwrap();
    let mut body = String::new();
    for (name, code) in images {
        fs::write(images_dir.join(name), b"").unwrap();
        body.push_str(&format!(
            "<image><source><filename>images/{name}</filename></source>\
             <classifications><classification><code>{code}</code><value>1.0</value></classification></classifications></image>"
        ));
    }
    let taxons = taxons
        .iter()
        .map(|code| format!("<taxon><code>{code}</code><isClass>true</isClass></taxon>"))
        .collect::<String>();
    let path = root.join("project.xml");
    fs::write(
        &path,
        format!("<project><images>{body}</images><taxons>{taxons}</taxons></project>"),
    )
    .unwrap();
    path
}
