use crate::models::{Document, DocumentOrigin, Page, PageSize, SourceDescriptor};
use crate::normalizer::normalize;

struct PlaceholderSpec {
    name: &'static str,
    display_name: &'static str,
    category: &'static str,
    size: u64,
    pages: &'static [&'static str],
}

const PLACEHOLDERS: &[PlaceholderSpec] = &[
    PlaceholderSpec {
        name: "documento-tecnico-1.pdf",
        display_name: "Documento Técnico de Calidad",
        category: "técnico",
        size: 1_024_000,
        pages: &[
            "DOCUMENTO TÉCNICO DE CALIDAD\n\nEste documento establece los procedimientos y estándares técnicos para la implementación de sistemas de gestión de calidad en organizaciones industriales. El objetivo principal es garantizar la conformidad con las normas internacionales ISO 9001:2015.\n\nAlcance del Documento:\n• Procedimientos de control de calidad\n• Metodologías de inspección\n• Criterios de aceptación y rechazo\n• Documentación requerida\n\nResponsabilidades:\nEl departamento de calidad será responsable de la implementación y seguimiento de todos los procedimientos descritos en este documento.",
            "CAPÍTULO 2: METODOLOGÍAS Y PROCESOS\n\nEste capítulo describe las metodologías recomendadas para la implementación de estándares técnicos en organizaciones. Se incluyen diagramas de flujo y procedimientos paso a paso para garantizar una implementación exitosa.\n\nProceso de Implementación:\n1. Diagnóstico inicial: Evaluación del estado actual\n2. Planificación: Desarrollo del plan de implementación\n3. Ejecución: Implementación de los cambios\n4. Verificación: Auditorías y revisiones\n5. Mejora continua: Optimización del sistema\n\nHerramientas requeridas:\n• Software de gestión documental\n• Equipos de medición calibrados\n• Personal capacitado",
            "SECCIÓN 3: HERRAMIENTAS DE EVALUACIÓN\n\nPresenta las herramientas necesarias para evaluar la conformidad con los estándares establecidos. Incluye listas de verificación y criterios de auditoría.\n\nLista de Verificación Principal:\n• Documentación actualizada\n• Procedimientos implementados\n• Personal capacitado\n• Equipos calibrados\n• Registros de calidad completos\n\nCriterios de Auditoría:\n• Conformidad con ISO 9001:2015\n• Efectividad de los procesos\n• Satisfacción del cliente\n• Mejora continua demostrable",
        ],
    },
    PlaceholderSpec {
        name: "norma-iso-9001.pdf",
        display_name: "Norma ISO 9001:2015",
        category: "normativo",
        size: 2_048_000,
        pages: &[
            "NORMA INTERNACIONAL ISO 9001:2015\n\nSistemas de gestión de calidad - Requisitos\n\nISO 9001 es un estándar internacional que especifica los requisitos para un sistema de gestión de calidad. Las organizaciones utilizan este estándar para demostrar su capacidad de proporcionar productos y servicios que satisfagan los requisitos del cliente y los reglamentarios aplicables.\n\nBeneficios de la implementación:\n• Mejora de la satisfacción del cliente\n• Reducción de costos operativos\n• Aumento de la eficiencia\n• Mejor gestión de riesgos\n• Acceso a nuevos mercados",
            "PRINCIPIOS DE GESTIÓN DE CALIDAD\n\nLa norma ISO 9001:2015 se basa en siete principios fundamentales:\n\n1. Enfoque al cliente: Cumplir y superar las expectativas del cliente\n2. Liderazgo: Crear y mantener un ambiente interno\n3. Participación del personal: Involucrar a todo el personal\n4. Enfoque basado en procesos: Gestionar actividades como procesos\n5. Mejora continua: Mejorar constantemente el desempeño\n6. Toma de decisiones basada en evidencia: Basar decisiones en datos\n7. Gestión de las relaciones: Gestionar relaciones con partes interesadas",
            "CAPÍTULO 4: CONTEXTO DE LA ORGANIZACIÓN\n\n4.1 Comprensión de la organización y su contexto\n\nLa organización debe determinar las cuestiones externas e internas que son pertinentes para su propósito y que afectan a su capacidad para lograr los resultados previstos de su sistema de gestión de calidad.\n\nFactores externos:\n• Entorno legal y reglamentario\n• Competencia y mercado\n• Factores tecnológicos\n• Factores culturales y sociales\n\nFactores internos:\n• Cultura organizacional\n• Recursos disponibles\n• Estructura organizacional\n• Capacidades y conocimientos",
            "CAPÍTULO 5: LIDERAZGO\n\n5.1 Liderazgo y compromiso\n\nLa alta dirección debe demostrar liderazgo y compromiso con respecto al sistema de gestión de calidad:\n\n• Asumiendo la responsabilidad y obligación de rendir cuentas\n• Asegurándose de que se establezcan la política y los objetivos de calidad\n• Asegurándose de la integración de los requisitos del SGC\n• Promoviendo el uso del enfoque a procesos\n• Asegurándose de que los recursos necesarios estén disponibles\n• Comunicando la importancia de una gestión de calidad eficaz\n• Asegurándose de que el SGC logre los resultados previstos\n• Dirigiendo y apoyando a las personas\n• Promoviendo la mejora continua",
        ],
    },
    PlaceholderSpec {
        name: "procedimiento-calidad.pdf",
        display_name: "Procedimiento de Control de Calidad",
        category: "procedimiento",
        size: 512_000,
        pages: &[
            "PROCEDIMIENTO DE CONTROL DE CALIDAD\n\nCódigo: PC-001\nVersión: 2.1\nFecha: 2024\n\nEste documento establece los pasos necesarios para implementar un sistema de control de calidad efectivo en la organización. Define responsabilidades y metodologías de inspección para garantizar la conformidad con los estándares establecidos.\n\nObjetivo:\nAsegurar que todos los productos y servicios cumplan con los requisitos de calidad especificados mediante la implementación de controles sistemáticos y verificaciones continuas.",
            "PROCESO DE INSPECCIÓN DETALLADO\n\n1. Recepción de materiales:\n• Verificar documentación de entrega\n• Inspección visual inicial\n• Toma de muestras según plan de muestreo\n• Registro de entrada en sistema\n\n2. Verificación de especificaciones:\n• Comparar con especificaciones técnicas\n• Verificar dimensiones y tolerancias\n• Comprobar propiedades físicas y químicas\n• Documentar desviaciones identificadas\n\n3. Pruebas de conformidad:\n• Realizar pruebas según normas aplicables\n• Utilizar equipos calibrados\n• Registrar todos los resultados\n• Analizar tendencias y patrones",
            "CRITERIOS DE ACEPTACIÓN Y DOCUMENTACIÓN\n\nCriterios de Aceptación:\nLos productos deben cumplir con todas las especificaciones técnicas establecidas:\n• Tolerancias dimensionales: ±0.1mm\n• Acabado superficial: Ra ≤ 3.2μm\n• Resistencia mecánica: según norma ASTM\n• Pruebas eléctricas: 100% conformidad\n\nDocumentación Requerida:\n• Certificados de materiales\n• Informes de inspección\n• Registros de calibración\n• No conformidades identificadas\n• Acciones correctivas implementadas\n\nCualquier desviación debe ser documentada y evaluada por el equipo de calidad para determinar la aceptabilidad del producto.",
        ],
    },
    PlaceholderSpec {
        name: "guia-implementacion.pdf",
        display_name: "Guía de Implementación de Estándares",
        category: "guía",
        size: 1_536_000,
        pages: &[
            "GUÍA DE IMPLEMENTACIÓN DE ESTÁNDARES\n\nManual Práctico para Organizaciones\n\nEsta guía proporciona instrucciones paso a paso para implementar estándares de calidad en diferentes tipos de organizaciones. Incluye ejemplos prácticos, casos de estudio y herramientas útiles para facilitar el proceso de implementación.\n\nContenido de la Guía:\n• Metodología de implementación\n• Herramientas y plantillas\n• Casos de estudio reales\n• Mejores prácticas\n• Indicadores de éxito\n\nAudiencia objetivo:\n• Gerentes de calidad\n• Consultores especializados\n• Auditores internos\n• Personal de mejora continua",
            "FASE 1: DIAGNÓSTICO INICIAL\n\nEvaluación del estado actual de la organización\n\nEsta fase incluye la identificación de brechas con respecto a los estándares objetivo mediante:\n\nAnálisis de Procesos:\n• Mapeo de procesos actuales\n• Identificación de entradas y salidas\n• Análisis de flujos de trabajo\n• Detección de redundancias\n• Evaluación de eficiencia\n\nEvaluación de Recursos:\n• Personal disponible y competencias\n• Infraestructura existente\n• Tecnología y sistemas\n• Recursos financieros\n• Documentación actual\n\nHerramientas recomendadas:\n• Matriz de diagnóstico GAP\n• Cuestionarios de autoevaluación\n• Entrevistas estructuradas\n• Observación directa de procesos",
            "FASE 2: PLANIFICACIÓN ESTRATÉGICA\n\nDesarrollo del plan de implementación\n\nEsta fase establece el roadmap para la implementación exitosa:\n\nCronograma Detallado:\n• Hitos principales y entregables\n• Secuencia de actividades\n• Dependencias críticas\n• Recursos asignados por fase\n• Fechas de revisión y evaluación\n\nGestión de Recursos:\n• Presupuesto total y por fase\n• Asignación de personal\n• Capacitación requerida\n• Tecnología necesaria\n• Proveedores externos\n\nDefinición de Indicadores:\n• KPIs de proceso\n• Métricas de calidad\n• Indicadores financieros\n• Satisfacción del cliente\n• Criterios de éxito específicos",
            "ALAMBRADO Y CERCADO PERIMETRAL\n\nMateriales necesarios para alambrado:\n• Postes de madera tratada o concreto cada 3 metros\n• Alambre galvanizado calibre 12.5\n• Grampas galvanizadas para fijación\n• Tensores y templadores\n• Aisladores para cercas eléctricas si aplica\n\nHerramientas requeridas:\n• Cavadora de hoyos\n• Martillo\n• Alicates\n• Nivel\n• Cinta métrica\n• Barreta\n\nProceso de instalación:\n1. Marcar el perímetro y ubicación de postes\n2. Cavar hoyos de 60cm de profundidad\n3. Instalar postes verificando verticalidad\n4. Tender alambre comenzando por la línea superior\n5. Tensar alambre uniformemente\n6. Fijar con grampas cada 30cm\n\nEspecificaciones técnicas:\n• Altura mínima 1.5 metros\n• Distancia entre postes máximo 3 metros\n• Tensión del alambre 150-200 kg\n• Profundidad de postes mínimo 60cm",
            "MANTENIMIENTO DE ALAMBRADO\n\nInspección periódica:\n• Revisar tensión del alambre mensualmente\n• Verificar estado de postes y grampas\n• Controlar vegetación que pueda afectar la cerca\n• Reparar daños inmediatamente\n\nMateriales de repuesto recomendados:\n• Alambre galvanizado de repuesto\n• Grampas adicionales\n• Postes de reemplazo\n• Herramientas de tensado\n\nVida útil esperada:\n• Alambre galvanizado 15-20 años\n• Postes de madera tratada 10-15 años\n• Postes de concreto 25-30 años\n\nFactores que afectan durabilidad:\n• Condiciones climáticas\n• Calidad de materiales\n• Instalación correcta\n• Mantenimiento regular",
        ],
    },
];

/// Statically defined documents served when real extraction is unavailable.
#[derive(Debug, Clone)]
pub struct PlaceholderRegistry {
    documents: Vec<Document>,
}

impl Default for PlaceholderRegistry {
    fn default() -> Self {
        Self {
            documents: PLACEHOLDERS.iter().map(build_placeholder).collect(),
        }
    }
}

impl PlaceholderRegistry {
    pub fn empty() -> Self {
        Self {
            documents: Vec::new(),
        }
    }

    pub fn register(&mut self, mut document: Document) {
        document.origin = DocumentOrigin::Placeholder;
        self.documents.push(document);
    }

    pub fn all(&self) -> Vec<Document> {
        self.documents.clone()
    }

    pub fn for_source(&self, source: &SourceDescriptor) -> Option<Document> {
        self.documents
            .iter()
            .find(|document| document.display_name == source.display_name)
            .or_else(|| {
                self.documents
                    .iter()
                    .find(|document| document.category == source.category)
            })
            .cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

fn build_placeholder(spec: &PlaceholderSpec) -> Document {
    let text_content = spec
        .pages
        .iter()
        .zip(1u32..)
        .map(|(text, page)| Page {
            page,
            text: normalize(text),
            images: Vec::new(),
            page_size: PageSize::default(),
        })
        .collect::<Vec<_>>();

    Document {
        name: spec.name.to_string(),
        display_name: spec.display_name.to_string(),
        category: spec.category.to_string(),
        pages: text_content.len() as u32,
        size: spec.size,
        text_content,
        metadata: None,
        url: None,
        title: spec.display_name.to_string(),
        checksum: None,
        origin: DocumentOrigin::Placeholder,
    }
}
