pub fn build_extraction_prompt(chunk_text: &str) -> String {
    format!(
        r#"Extract entities and relationships from the following text.

INSTRUCTIONS:
1. Identify key entities (people, organizations, concepts, technologies, locations, events)
2. Extract directed relationships between those entities
3. Output ONLY a strict JSON object, nothing else
4. Use the exact schema below

SCHEMA:
{{
  "entities": ["EntityName", "..."],
  "relations": [
    {{"source": "EntityName", "target": "OtherEntity", "relation": "relationship_type"}}
  ]
}}

RULES:
- Entity names must be copied as they appear in the text
- Every relation source and target should also appear in "entities"
- Relation types should be short verbs: "creates", "uses", "affects", "manages", "contains", etc.
- Output ONLY the JSON object, no markdown, no code fences, no explanations

TEXT:
{}

JSON OUTPUT:"#,
        chunk_text
    )
}
