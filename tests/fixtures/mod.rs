//! Canned model outputs, shaped the way small local models actually answer
#![allow(dead_code)]

/// A model reply together with what the API should make of it
#[derive(Debug, Clone)]
pub struct ModelReplyFixture {
    pub reply: &'static str,
    pub description: &'static str,
}

pub const DESCRIPTIONS_FENCED: ModelReplyFixture = ModelReplyFixture {
    reply: r#"```json
[
  {"titulo": "Lámpara Solar Aurora", "descripcion_comercial": "Ilumina tu jardín toda la noche sin cables ni facturas."},
  {"titulo": "Brillo Verde", "descripcion_comercial": "Energía del sol, luz cálida para tus espacios exteriores."},
  {"titulo": "", "descripcion_comercial": "Propuesta sin título que debe descartarse."}
]
```"#,
    description: "Fenced array with one malformed entry",
};

pub const DESCRIPTIONS_NOT_JSON: ModelReplyFixture = ModelReplyFixture {
    reply: "Claro, aquí tienes algunas ideas: Lámpara Solar Aurora, ilumina tu jardín.",
    description: "Prose answer with no JSON at all",
};

pub const COMMENTS_WITH_PROSE: ModelReplyFixture = ModelReplyFixture {
    reply: r#"Aquí están los comentarios solicitados:
[
  {"usuario": "CafeLover_88", "calificacion": 5, "comentario": "Aroma increíble, se nota la calidad.", "fecha_relativa": "hace 2 días", "util": 14},
  {"usuario": "MarcoP", "calificacion": 3, "comentario": "Bueno, pero un poco amargo para mi gusto.", "fecha_relativa": "hace 1 semana", "util": 3}
]
Espero que te sirvan."#,
    description: "Array wrapped in prose, recovered by the span tier",
};

pub const SUMMARY_OVERCONFIDENT: ModelReplyFixture = ModelReplyFixture {
    reply: r#"{
  "resumen_general": "Los clientes valoran el aroma, aunque algunos critican el amargor.",
  "aspectos_positivos": ["Aroma", "Frescura"],
  "aspectos_negativos": ["Amargor"],
  "recomendacion_mejoras": ["Ofrecer un tueste más suave"],
  "calificacion_promedio": 4.9,
  "sentiment_general": "positivo"
}"#,
    description: "Summary whose numbers disagree with the comments",
};

pub const SUMMARY_AS_ARRAY: ModelReplyFixture = ModelReplyFixture {
    reply: r#"["Buen café", "Algo amargo"]"#,
    description: "Summary answered as a list instead of an object",
};
