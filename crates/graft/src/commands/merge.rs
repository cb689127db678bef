//! Merge command implementation

use anyhow::{Context, Result, bail};
use graft_core::{
    ArrayDefault, MemorySecretStore, MergeOptions, Node, PipelineOptions, Registry, RunContext,
    SecretData, pipeline,
};
use std::fs;
use std::path::{Path, PathBuf};

pub struct MergeArgs {
    pub files: Vec<PathBuf>,
    pub fallback_append: bool,
    pub skip_eval: bool,
    pub prune: Vec<String>,
    pub secrets: Option<PathBuf>,
    pub redact: bool,
    pub json: bool,
}

fn read_document(path: &Path) -> Result<Node> {
    let content =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let doc = graft_yaml::parse_document_root(&content, &path.display().to_string())?;
    Ok(doc)
}

/// Load a secrets file: each top-level key is a secret path holding a flat
/// mapping of scalar values.
fn load_secrets(path: &Path) -> Result<MemorySecretStore> {
    let doc = read_document(path)?;
    let mut store = MemorySecretStore::new();

    for (secret_path, entries) in doc.as_mapping().into_iter().flatten() {
        let Some(entries) = entries.as_mapping() else {
            bail!(
                "{}: secret `{}` must be a map of keys to values",
                path.display(),
                secret_path
            );
        };
        let mut data = SecretData::new();
        for (key, value) in entries {
            let Some(text) = value.scalar_string() else {
                bail!(
                    "{}: secret `{}` key `{}` must be a scalar",
                    path.display(),
                    secret_path,
                    key
                );
            };
            data.insert(key.clone(), text);
        }
        store.insert(secret_path.clone(), data);
    }

    tracing::debug!(secrets = store.len(), "loaded secrets");
    Ok(store)
}

pub fn execute(args: MergeArgs) -> Result<()> {
    let docs = args
        .files
        .iter()
        .map(|path| read_document(path))
        .collect::<Result<Vec<Node>>>()?;

    let mut ctx = RunContext::new();
    if let Some(path) = &args.secrets {
        ctx = ctx.with_secret_store(Box::new(load_secrets(path)?));
    }
    ctx.redact = args.redact;

    let options = PipelineOptions {
        merge: MergeOptions {
            array_default: if args.fallback_append {
                ArrayDefault::Append
            } else {
                ArrayDefault::Inline
            },
        },
        skip_eval: args.skip_eval,
        prune: args.prune,
        ..Default::default()
    };

    let tree = pipeline::run(&docs, &options, &mut Registry::with_builtins(), &mut ctx)?;

    let output = if args.json {
        format!("{}\n", serde_json::to_string_pretty(&tree)?)
    } else {
        graft_yaml::emit(&tree)?
    };
    print!("{}", output);
    Ok(())
}
