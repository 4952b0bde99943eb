//! Prompt templates for lineage analysis

use super::bridge::Snippet;

/// Instructions sent ahead of the snippets.
pub const LINEAGE_PROMPT: &str = r#"You will be given a series of code snippets from one notebook. For each snippet, report every data source it reads from and every data destination it writes to. Skip snippets that neither read nor write data.

Answer with a single JSON object shaped like this:

{
  "rw": [
    {
      "id": "<snippet id>",
      "read": [{"kind": "table", "location": "sales_db", "name": "orders"}],
      "write": [{"kind": "file", "location": "/exports", "name": "summary.csv"}]
    }
  ]
}

Rules:
- "kind" is one of "table", "view", "file".
- For a table or view, "location" is the database that holds it (an in-memory database counts).
- For a file, "location" is the directory containing it and "name" is the file name.
- Use the snippet id exactly as given.

The snippets follow."#;

/// System prompt for lineage analysis
pub const LINEAGE_SYSTEM_PROMPT: &str =
    "You are a data lineage analyst. Report only reads and writes evident in the code and reply with valid JSON.";

/// Frame each snippet as its id followed by a fenced block tagged with its kind.
pub fn snippets_block(snippets: &[Snippet]) -> String {
    let mut out = String::new();
    for snippet in snippets {
        out.push_str(&format!("code snippet {}:\n\n", snippet.id));
        out.push_str(&format!("```{}\n{}\n```\n\n", snippet.kind, snippet.source));
    }
    out
}

/// Full user message for one notebook.
pub fn lineage_prompt(snippets: &[Snippet]) -> String {
    format!("{}\n\n{}", LINEAGE_PROMPT, snippets_block(snippets))
}
