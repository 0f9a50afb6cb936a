use serde_json::{json, Value};

fn error_response(description: &str) -> Value {
    json!({
        "description": description,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/ErrorResponse" }
            }
        }
    })
}

fn json_response(description: &str, schema: Value) -> Value {
    json!({
        "description": description,
        "content": { "application/json": { "schema": schema } }
    })
}

fn id_parameter() -> Value {
    json!({
        "name": "id",
        "in": "path",
        "required": true,
        "schema": { "type": "integer", "format": "int64" }
    })
}

fn payload_body() -> Value {
    json!({
        "required": true,
        "content": {
            "application/json": {
                "schema": { "$ref": "#/components/schemas/BookPayload" }
            }
        }
    })
}

/// OpenAPI fragment describing the books routes, relative to `/api/books`.
pub fn fragment() -> Value {
    let message = json!({ "$ref": "#/components/schemas/Message" });

    json!({
        "paths": {
            "/": {
                "get": {
                    "summary": "List books, newest first",
                    "tags": ["Books"],
                    "parameters": [
                        { "name": "page", "in": "query", "schema": { "type": "integer", "minimum": 1, "default": 1 } },
                        { "name": "per_page", "in": "query", "schema": { "type": "integer", "minimum": 1, "maximum": 100, "default": 10 } }
                    ],
                    "responses": {
                        "200": json_response("One page of books", json!({ "$ref": "#/components/schemas/BookList" })),
                        "400": error_response("Invalid pagination parameters"),
                        "500": error_response("Internal server error")
                    }
                },
                "post": {
                    "summary": "Create a book",
                    "tags": ["Books"],
                    "requestBody": payload_body(),
                    "responses": {
                        "201": json_response("Book created", json!({ "$ref": "#/components/schemas/Created" })),
                        "400": error_response("Missing required field"),
                        "409": error_response("Duplicate isbn"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/{id}": {
                "get": {
                    "summary": "Get a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": json_response("The book", json!({ "$ref": "#/components/schemas/Book" })),
                        "404": error_response("Book not found"),
                        "500": error_response("Internal server error")
                    }
                },
                "put": {
                    "summary": "Replace every field of a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "requestBody": payload_body(),
                    "responses": {
                        "200": json_response("Book updated", message.clone()),
                        "400": error_response("Missing required field"),
                        "404": error_response("Book not found"),
                        "409": error_response("Duplicate isbn"),
                        "500": error_response("Internal server error")
                    }
                },
                "delete": {
                    "summary": "Delete a book",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": json_response("Book deleted", message),
                        "404": error_response("Book not found"),
                        "500": error_response("Internal server error")
                    }
                }
            },
            "/{id}/reviews": {
                "get": {
                    "summary": "Reviews of a book, fetched from the review service",
                    "tags": ["Books"],
                    "parameters": [id_parameter()],
                    "responses": {
                        "200": json_response("Reviews as returned by the review service; empty when it has none", json!({ "type": "object" })),
                        "404": error_response("Book not found"),
                        "502": error_response("Review service returned an error"),
                        "503": error_response("Review service unavailable")
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "Book": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "isbn": { "type": "string", "nullable": true },
                        "publication_year": { "type": "integer", "nullable": true },
                        "genre": { "type": "string", "nullable": true },
                        "description": { "type": "string", "nullable": true },
                        "price": { "type": "number", "nullable": true },
                        "stock_quantity": { "type": "integer" },
                        "created_at": { "type": "string", "format": "date-time" },
                        "updated_at": { "type": "string", "format": "date-time" }
                    },
                    "required": ["id", "title", "author", "stock_quantity", "created_at", "updated_at"]
                },
                "BookPayload": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "author": { "type": "string" },
                        "isbn": { "type": "string" },
                        "publication_year": { "type": "integer" },
                        "genre": { "type": "string" },
                        "description": { "type": "string" },
                        "price": { "type": "number" },
                        "stock_quantity": { "type": "integer", "default": 0 }
                    },
                    "required": ["title", "author"]
                },
                "BookList": {
                    "type": "object",
                    "properties": {
                        "books": { "type": "array", "items": { "$ref": "#/components/schemas/Book" } },
                        "pagination": {
                            "type": "object",
                            "properties": {
                                "page": { "type": "integer" },
                                "per_page": { "type": "integer" },
                                "total": { "type": "integer" },
                                "total_pages": { "type": "integer" }
                            }
                        }
                    }
                },
                "Created": {
                    "type": "object",
                    "properties": {
                        "id": { "type": "integer", "format": "int64" },
                        "message": { "type": "string" }
                    }
                },
                "Message": {
                    "type": "object",
                    "properties": { "message": { "type": "string" } }
                }
            }
        }
    })
}
