use std::path::Path;

/// 沒有副檔名的暫存檔 (上傳元件產生的隨機檔名) 一律當成 JPEG
pub const FALLBACK_MIME: &str = "image/jpeg";

/// 依副檔名判斷 mime type；非圖片或隱藏檔回傳 None
pub fn mime_type_for(file_name: &str) -> Option<&'static str> {
    if file_name.starts_with('.') {
        return None;
    }

    let extension = match Path::new(file_name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => ext.to_ascii_lowercase(),
        None => return Some(FALLBACK_MIME),
    };

    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "webp" => Some("image/webp"),
        "gif" => Some("image/gif"),
        "heic" => Some("image/heic"),
        "heif" => Some("image/heif"),
        "bmp" => Some("image/bmp"),
        "tif" | "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// 暫存區檔名 → (檔名, mime type)；保留原本順序，略過非圖片檔
pub fn select_images(file_names: Vec<String>) -> Vec<(String, &'static str)> {
    file_names
        .into_iter()
        .filter_map(|name| match mime_type_for(&name) {
            Some(mime_type) => Some((name, mime_type)),
            None => {
                tracing::warn!("Skipping non-image file: {}", name);
                None
            }
        })
        .collect()
}
