/// Request to store file content
#[derive(Debug, Clone)]
pub struct FileStorageRequest {
    pub content: Vec<u8>,
    /// Lowercased extension including the dot, e.g. `.pdf`. Kept on the stored name so that
    /// files on disk remain recognisable.
    pub extension: String,
}

/// Response from storing file content
#[derive(Debug, Clone)]
pub struct FileStorageResponse {
    /// Storage key to save in the database: the file name relative to the upload directory,
    /// e.g. `1718035200123-482913374.pdf`
    pub storage_key: String,
}
