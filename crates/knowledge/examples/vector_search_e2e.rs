//! End-to-end retrieval against a live Ollama server, in memory.
//!
//! Needs `ollama pull nomic-embed-text` and a server on localhost:11434.

use aiops_core::{Collection, Document, IndexBackend, StoreConfig, Topic};
use aiops_knowledge::{format_context, CreateOutcome, KnowledgeStore, RetrieveOptions};

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    println!("=== AI-OPS Retrieval E2E ===\n");

    let config = StoreConfig {
        index: IndexBackend::InMemory,
        ..StoreConfig::default()
    };
    println!("[OK] Model: {}\n", config.embedding.model);

    let store = KnowledgeStore::new(config).await?;
    println!("[OK] Store ready ({} dimensions)\n", store.embedding_size());

    let documents = vec![
        Document::new(
            "Reflected XSS",
            "Reflected cross-site scripting echoes request parameters into the response without encoding.",
            Topic::Web,
        ),
        Document::new(
            "SQL injection",
            "Union based SQL injection appends a SELECT to read columns from other tables.",
            Topic::Web,
        ),
        Document::new(
            "Host discovery",
            "nmap -sn performs a ping sweep to find live hosts on a subnet.",
            Topic::Network,
        ),
        Document::new(
            "SUID binaries",
            "find / -perm -4000 lists SUID binaries that may allow privilege escalation.",
            Topic::PrivilegeEscalation,
        ),
    ];

    let outcome = store
        .create_collection(Collection::new(0, "e2e", documents), true)
        .await?;
    match outcome {
        CreateOutcome::Created { points } => println!("[OK] Uploaded {} points\n", points),
        other => println!("[WARN] Collection not created: {:?}\n", other),
    }

    let queries = [
        "how do I find live hosts on a network",
        "inject javascript into a page",
        "escalate privileges on linux",
    ];

    for query in queries {
        println!("--- Query: {} ---", query);
        let passages = store
            .retrieve_passages(query, "e2e", RetrieveOptions { limit: 2, threshold: 0.3 })
            .await?;
        if passages.is_empty() {
            println!("  (no passage above threshold)\n");
            continue;
        }
        for passage in &passages {
            println!("  [{:.3}] {} ({})", passage.score, passage.title, passage.topic);
        }
        println!("{}", format_context(&passages));
    }

    println!("=== Done ===");
    Ok(())
}
