use sha2::{Digest, Sha256}; // 引入 SHA2 算法和 Digest 特性(方法集)

/// 计算数据集指纹
///
/// 输入是嵌入二进制里的原始夹具字节（不是反序列化之后的结构体），
/// 所以同一份 JSON 文件永远得到同一个指纹，可以直接当强 ETag 用。
pub fn dataset_fingerprint(raw: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw);

    // 小写十六进制，64 字符
    hex::encode(hasher.finalize())
}

/// 包成 HTTP 强校验器格式：带双引号
pub fn etag(fingerprint: &str) -> String {
    format!("\"{}\"", fingerprint)
}

/// 判断 If-None-Match 请求头是否命中
///
/// 支持逗号分隔的多个校验器、弱校验器前缀 `W/` 和通配符 `*`。
pub fn if_none_match_hits(header: &str, fingerprint: &str) -> bool {
    let expected = etag(fingerprint);
    header.split(',').map(str::trim).any(|candidate| {
        candidate == "*" || candidate.trim_start_matches("W/") == expected
    })
}
