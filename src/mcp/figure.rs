//! Plotly figure documents produced by the chart tools.
//!
//! A figure serializes to the `{"data": [...], "layout": {...}}` shape that
//! plotly.js renders directly. Builders validate that every per-point array
//! lines up with its axis before anything is serialized.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::mcp::service::{BarChartParams, HeatMapParams, LineChartParams};

#[derive(Error, Debug, PartialEq)]
pub enum FigureError {
    #[error("{field} has {actual} entries but {expected} were expected{}", index_suffix(.index))]
    LengthMismatch {
        field: &'static str,
        index: Option<usize>,
        expected: usize,
        actual: usize,
    },

    #[error("x has {x_sets} data sets but y has {y_sets}")]
    TraceCountMismatch { x_sets: usize, y_sets: usize },

    #[error("failed to serialize figure: {0}")]
    Serialize(String),
}

fn index_suffix(index: &Option<usize>) -> String {
    index.map(|i| format!(" at index {i}")).unwrap_or_default()
}

/// A heat-map axis may be numeric or categorical.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum AxisValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Figure {
    pub data: Vec<Trace>,
    pub layout: Layout,
}

impl Figure {
    pub fn to_json(&self) -> Result<String, FigureError> {
        serde_json::to_string(self).map_err(|e| FigureError::Serialize(e.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Trace {
    Scatter {
        x: Vec<f64>,
        y: Vec<f64>,
        mode: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        customdata: Option<Vec<Value>>,
        #[serde(skip_serializing_if = "Option::is_none")]
        line: Option<LineStyle>,
    },
    Bar {
        x: Vec<String>,
        y: Vec<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        hovertext: Option<Vec<String>>,
    },
    Heatmap {
        x: Vec<AxisValue>,
        y: Vec<AxisValue>,
        z: Vec<Vec<f64>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineStyle {
    pub shape: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Layout {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xaxis: Option<Axis>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yaxis: Option<Axis>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Title {
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis {
    pub title: Title,
}

fn axis(label: Option<&String>) -> Option<Axis> {
    label.map(|text| Axis {
        title: Title { text: text.clone() },
    })
}

fn check_len(
    field: &'static str,
    index: Option<usize>,
    expected: usize,
    actual: usize,
) -> Result<(), FigureError> {
    if expected == actual {
        Ok(())
    } else {
        Err(FigureError::LengthMismatch {
            field,
            index,
            expected,
            actual,
        })
    }
}

/// One line trace per `(x, y)` pair.
pub fn line_figure(params: &LineChartParams) -> Result<Figure, FigureError> {
    let sets = params.x.len();
    if params.y.len() != sets {
        return Err(FigureError::TraceCountMismatch {
            x_sets: sets,
            y_sets: params.y.len(),
        });
    }
    if let Some(labels) = &params.labels {
        check_len("labels", None, sets, labels.len())?;
    }
    if let Some(custom) = &params.custom_data {
        check_len("custom_data", None, sets, custom.len())?;
    }

    let line = params.spline.unwrap_or(false).then(|| LineStyle {
        shape: "spline".to_string(),
    });

    let mut data = Vec::with_capacity(sets);
    for (idx, (x, y)) in params.x.iter().zip(&params.y).enumerate() {
        check_len("y", Some(idx), x.len(), y.len())?;
        let customdata = match &params.custom_data {
            Some(custom) => {
                check_len("custom_data", Some(idx), x.len(), custom[idx].len())?;
                Some(custom[idx].clone())
            }
            None => None,
        };
        data.push(Trace::Scatter {
            x: x.clone(),
            y: y.clone(),
            mode: "lines".to_string(),
            name: params.labels.as_ref().map(|l| l[idx].clone()),
            customdata,
            line: line.clone(),
        });
    }

    let axes = params.axes_labels.clone().unwrap_or_default();
    Ok(Figure {
        data,
        layout: Layout {
            title: params.title.clone().map(|text| Title { text }),
            xaxis: axis(axes.x.as_ref()),
            yaxis: axis(axes.y.as_ref()),
        },
    })
}

pub fn bar_figure(params: &BarChartParams) -> Result<Figure, FigureError> {
    check_len("y", None, params.x.len(), params.y.len())?;
    if let Some(hover) = &params.hover_labels {
        check_len("hover_labels", None, params.x.len(), hover.len())?;
    }
    Ok(Figure {
        data: vec![Trace::Bar {
            x: params.x.clone(),
            y: params.y.clone(),
            hovertext: params.hover_labels.clone(),
        }],
        layout: Layout::default(),
    })
}

/// `z` holds one row per y value, each row one cell per x value.
pub fn heat_map_figure(params: &HeatMapParams) -> Result<Figure, FigureError> {
    check_len("z", None, params.y.len(), params.z.len())?;
    for (idx, row) in params.z.iter().enumerate() {
        check_len("z row", Some(idx), params.x.len(), row.len())?;
    }
    Ok(Figure {
        data: vec![Trace::Heatmap {
            x: params.x.clone(),
            y: params.y.clone(),
            z: params.z.clone(),
        }],
        layout: Layout::default(),
    })
}
