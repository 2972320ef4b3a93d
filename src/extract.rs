//! Extracción de texto de los ficheros subidos (PDF y formatos de texto
//! plano). El texto extraído es el contenido del documento almacenado.

use anyhow::{anyhow, Result};
use mime_guess::MimeGuess;
use std::path::Path;
use tracing::warn;

/// Extensiones tratadas como texto plano UTF-8.
const TEXT_EXTENSIONS: [&str; 7] = ["txt", "md", "markdown", "csv", "log", "html", "json"];

/// Tipo MIME adivinado a partir del nombre del fichero.
pub fn mime_for(filename: &str) -> Option<String> {
    let mime: MimeGuess = MimeGuess::from_path(Path::new(filename));
    mime.first().map(|m| m.to_string())
}

/// Extrae el texto de un fichero subido según su extensión.
/// Los formatos no soportados son un error del lado del cliente.
pub fn extract_text(filename: &str, bytes: &[u8]) -> Result<String> {
    let extension = Path::new(filename)
        .extension()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("")
        .to_lowercase();

    let text = match extension.as_str() {
        "pdf" => match pdf_extract::extract_text_from_mem(bytes) {
            Ok(content) => content,
            Err(e) => {
                warn!("No se pudo extraer texto del PDF {filename}: {e}");
                return Err(anyhow!("No se pudo extraer texto del PDF: {e}"));
            }
        },
        ext if TEXT_EXTENSIONS.contains(&ext) => match String::from_utf8(bytes.to_vec()) {
            Ok(content) => content,
            Err(_) => {
                return Err(anyhow!("El fichero {filename} no es texto UTF-8 válido"));
            }
        },
        _ => {
            return Err(anyhow!(
                "Extensión no soportada ('.{extension}'); se aceptan PDF y ficheros de texto"
            ));
        }
    };

    if text.trim().is_empty() {
        return Err(anyhow!("El fichero {filename} está vacío o no contiene texto útil"));
    }

    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extrae_texto_plano() {
        let texto = extract_text("notas.txt", "Acta de la reunión inicial".as_bytes()).unwrap();
        assert_eq!(texto, "Acta de la reunión inicial");
    }

    #[test]
    fn rechaza_extensiones_no_soportadas() {
        assert!(extract_text("captura.png", &[0x89, 0x50, 0x4e, 0x47]).is_err());
    }

    #[test]
    fn rechaza_texto_no_utf8() {
        assert!(extract_text("datos.csv", &[0xff, 0xfe, 0x00]).is_err());
    }

    #[test]
    fn rechaza_ficheros_vacios() {
        assert!(extract_text("vacio.md", b"   \n  ").is_err());
    }

    #[test]
    fn adivina_el_mime_por_extension() {
        assert_eq!(mime_for("informe.pdf").as_deref(), Some("application/pdf"));
        assert_eq!(mime_for("notas.txt").as_deref(), Some("text/plain"));
        assert_eq!(mime_for("sin_extension"), None);
    }
}
