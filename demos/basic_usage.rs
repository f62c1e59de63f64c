use listing_api::impls::memory::MemoryStore;
use listing_api::list;
use listing_api::new_listing;
use listing_api::ListingResult;
use serde_json::json;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A versioned bucket in the v1 key format: masters under "\x7fM", versions under "\x7fV".
    let store = MemoryStore::from_iter([
        ("\x7fMphotos/1.jpg", r#"{"versionId":"2","last-modified":"2024-01-02"}"#),
        ("\x7fMnotes/year.txt", r#"{"versionId":"4","isDeleteMarker":true}"#),
        ("\x7fVphotos/1.jpg\u{0}2", r#"{"versionId":"2","last-modified":"2024-01-02"}"#),
        ("\x7fVphotos/1.jpg\u{0}3", r#"{"versionId":"3","last-modified":"2024-01-01"}"#),
        ("\x7fVnotes/year.txt\u{0}4", r#"{"versionId":"4","isDeleteMarker":true}"#),
    ]);

    // Current versions, grouped by "/"
    let ext = new_listing("DelimiterMaster", json!({"delimiter": "/"}), "v1")?;
    if let ListingResult::Delimiter(res) = list(&store, ext).await? {
        println!("CommonPrefixes: {:?}", res.common_prefixes);
        for c in res.contents {
            println!("Contents: {}", c.key);
        }
    }

    // Every version, one page at a time
    let mut params = json!({"maxKeys": 1});
    loop {
        let ext = new_listing("DelimiterVersions", params.clone(), "v1")?;
        let ListingResult::Versions(res) = list(&store, ext).await? else {
            break;
        };

        for v in &res.versions {
            println!("Version: {} {}", v.key, v.version_id);
        }

        if !res.is_truncated {
            break;
        }
        params["keyMarker"] = json!(res.next_key_marker);
        params["versionIdMarker"] = json!(res.next_version_id_marker);
    }

    // Delete markers with nothing left beneath them
    let ext = new_listing("DelimiterOrphanDeleteMarker", json!({}), "v1")?;
    println!("{}", serde_json::to_string_pretty(&list(&store, ext).await?)?);

    Ok(())
}
