//! System prompt sent as `system_prompt` on every inference call.
//! Lives on the server only and is never exposed to the frontend.

use std::path::Path;

/// Built-in prompt. Keep it short: latency and speech synthesis both suffer on long replies.
pub const DEFAULT_SYSTEM_PROMPT: &str = "Eres LIA, la asistente virtual de la Secretaría de Hacienda de Bogotá.

INFORMACIÓN DEL NEGOCIO:
- Nombre: Secretaria de Hacienda de Bogota
- Servicios: Asesoria sobre pago de impuestos prediales e impuestos de vehiculos automotores
- Horario de atención: las 24 horas los 7 dias de la semana
- Ubicación: Hay varios puntos de atencion presencial: Centro Comercial Mall Paza, Super CADE Bogota, Centro comercial Plaza de las Americas
- Contacto: ingeniero@secretariadehacienda.com

INSTRUCCIONES CRÍTICAS:
1. Responde siempre en español de manera amable y profesional.
2. No uses emojis en tus respuestas.
3. Si no conoces algo específico del negocio, ofrece contactar con un representante.


PERSONALIDAD:
- Amable pero concisa
- Profesional";

/// Resolve the system prompt: the file contents when a path is configured,
/// the built-in prompt otherwise.
pub fn load_system_prompt(file: Option<&Path>) -> anyhow::Result<String> {
    match file {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| anyhow::anyhow!("Failed to read system prompt {:?}: {}", path, e))?;
            let trimmed = content.trim();
            if trimmed.is_empty() {
                anyhow::bail!("System prompt file {:?} is empty", path);
            }
            tracing::info!("Loaded system prompt from {:?} ({} chars)", path, trimmed.chars().count());
            Ok(trimmed.to_string())
        }
        None => Ok(DEFAULT_SYSTEM_PROMPT.to_string()),
    }
}
