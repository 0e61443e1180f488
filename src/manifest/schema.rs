use serde_json::{json, Value};
use std::sync::LazyLock;

pub static MANIFEST_SCHEMA: LazyLock<Value> = LazyLock::new(|| {
    json!({
        "$schema": "http://json-schema.org/draft-07/schema#",
        "type": "object",
        "required": ["name", "version", "docker_config"],
        "properties": {
            "name": { "type": "string", "minLength": 1 },
            "version": { "type": ["string", "number"] },
            "description": { "type": "string" },
            "accepts": { "type": "string" },
            "rejects": { "type": "string" },
            "stage": { "type": "string", "enum": ["FILTER", "EXTRACT", "CORE", "SECONDARY", "POST"] },
            "category": {
                "type": "string",
                "enum": [
                    "Antivirus", "Dynamic Analysis", "External", "Extraction",
                    "Filtering", "Internet Connected", "Networking", "Static Analysis"
                ]
            },
            "file_required": { "type": "boolean" },
            "timeout": { "type": "integer", "minimum": 1 },
            "disable_cache": { "type": "boolean" },
            "enabled": { "type": "boolean" },
            "is_external": { "type": "boolean" },
            "privileged": { "type": "boolean" },
            "uses_tags": { "type": "boolean" },
            "uses_metadata": { "type": "boolean" },
            "uses_temp_submission_data": { "type": "boolean" },
            "licence_count": { "type": "integer", "minimum": 0 },
            "tool_version": { "type": ["string", "null"] },
            "config": { "type": "object" },
            "submission_params": { "type": "array", "items": { "$ref": "#/$defs/submission_param" } },
            "heuristics": { "type": "array", "items": { "$ref": "#/$defs/heuristic" } },
            "docker_config": { "$ref": "#/$defs/docker_config" },
            "update_config": {
                "type": "object",
                "required": ["method", "update_interval_seconds"],
                "properties": {
                    "method": { "type": "string", "enum": ["run", "build"] },
                    "sources": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["uri", "name"],
                            "properties": {
                                "uri": { "type": "string", "minLength": 1 },
                                "name": { "type": "string", "minLength": 1 },
                                "pattern": { "type": "string" }
                            }
                        }
                    },
                    "update_interval_seconds": { "type": "integer", "minimum": 1 },
                    "generates_signatures": { "type": "boolean" },
                    "run_options": { "$ref": "#/$defs/docker_config" }
                }
            }
        },
        "$defs": {
            "submission_param": {
                "type": "object",
                "required": ["name", "type", "default", "value"],
                "properties": {
                    "name": { "type": "string", "minLength": 1 },
                    "type": { "type": "string", "enum": ["bool", "int", "str", "list"] },
                    "list": { "type": "array", "items": { "type": "string" } },
                    "hide": { "type": "boolean" }
                }
            },
            "heuristic": {
                "type": "object",
                "required": ["heur_id", "name", "score"],
                "properties": {
                    "heur_id": { "type": "integer", "minimum": 0 },
                    "name": { "type": "string", "minLength": 1 },
                    "description": { "type": "string" },
                    "filetype": { "type": "string" },
                    "score": { "type": "integer" },
                    "attack_id": {
                        "anyOf": [
                            { "type": "string" },
                            { "type": "array", "items": { "type": "string" } },
                            { "type": "null" }
                        ]
                    },
                    "signature_score_map": {
                        "type": "object",
                        "additionalProperties": { "type": "integer" }
                    },
                    "max_score": { "type": ["integer", "null"] }
                }
            },
            "docker_config": {
                "type": "object",
                "required": ["image"],
                "properties": {
                    "image": { "type": "string", "minLength": 1 },
                    "cpu_cores": { "type": "number", "exclusiveMinimum": 0 },
                    "ram_mb": { "type": "integer", "minimum": 0 },
                    "ram_mb_min": { "type": "integer", "minimum": 0 },
                    "allow_internet_access": { "type": "boolean" },
                    "command": { "type": ["array", "null"], "items": { "type": "string" } },
                    "environment": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "required": ["name", "value"],
                            "properties": {
                                "name": { "type": "string" },
                                "value": { "type": "string" }
                            }
                        }
                    }
                }
            }
        }
    })
});
