//! Human-readable `summary.txt`.

use serde_json::Value;

use super::RunRecord;

/// Render the summary. The config section only appears when at least one
/// Buildroot config was found.
pub fn render_summary(record: &RunRecord) -> String {
    let mut lines: Vec<String> = vec![
        "Rootfs UBI sanity check summary".to_string(),
        format!("rootfs_img: {}", record.image.path.display()),
        format!("rootfs_img_sha256: {}", record.image.sha256),
        format!("volume_file: {}", record.volume.path.display()),
        format!("volume_file_sha256: {}", record.volume.sha256),
        format!("extracted_rootfs_dir: {}", record.rootfs_root.display()),
        String::new(),
    ];

    for result in &record.checklist.results {
        let status = if result.ok { "OK" } else { "FAIL" };
        let hits = Value::from(result.hits.clone());
        let extra = Value::Object(result.extra.clone());
        lines.push(format!(
            "[{}] {} hits={} extra={}",
            status, result.check, hits, extra
        ));
    }
    lines.push(String::new());

    lines.push("Optional presence:".to_string());
    for (path, present) in &record.checklist.optional {
        let state = if *present { "present" } else { "missing" };
        lines.push(format!("  {}: {}", path, state));
    }
    lines.push(String::new());

    if !record.buildroot.configs.is_empty() {
        lines.push("Buildroot .config grep (first few configs):".to_string());
        for (cfg, hits) in &record.buildroot.grep {
            lines.push(format!("  {}:", cfg.display()));
            if hits.is_empty() {
                lines.push("    (no matches)".to_string());
                continue;
            }
            for (key, matched) in hits {
                lines.push(format!("    {}: {}", key, Value::from(matched.clone())));
            }
        }
    }

    lines.join("\n") + "\n"
}
