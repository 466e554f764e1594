/// Extract the human-meaningful resource id from an AWS resource ARN.
///
/// The sixth `:`-separated segment carries the resource part. Services that nest
/// the id under a type prefix (`file-system/fs-123`) are reduced to the text after
/// the last `/`; anything with fewer than six segments is returned unchanged.
pub fn extract_resource_id(arn: &str) -> String {
    let parts: Vec<&str> = arn.split(':').collect();
    if parts.len() < 6 {
        return arn.to_string();
    }

    let resource_part = parts[5];
    match resource_part.rsplit_once('/') {
        Some((_, id)) => id.to_string(),
        None => resource_part.to_string(),
    }
}
